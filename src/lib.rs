#![deny(clippy::expect_used, clippy::unwrap_used)]

//! A rate-adaptive congestion control engine for a host transport.
//! 面向宿主传输层的速率自适应拥塞控制引擎。
//!
//! The host registers the algorithm in a [`registry::Registry`], opens one
//! [`session::Session`] per connection, and feeds it RTT and delivery samples.
//! Each sample yields a congestion window and a pacing rate. Operators adjust
//! tunables through a [`config::ConfigStore`] at any time.

pub mod config;
pub mod congestion;
pub mod error;
pub mod registry;
pub mod session;
pub mod stats;
