//! 定义了库中所有可能的错误类型。
//! Defines all possible error types in the library.
//!
//! The per-decision congestion path never fails; these errors belong to the
//! surfaces around it (configuration and registration).

use thiserror::Error;

/// The primary error type for the congestion-control engine.
/// 拥塞控制引擎的主要错误类型。
#[derive(Debug, Error)]
pub enum Error {
    /// No tunable carries the given name.
    /// 不存在该名称的可调参数。
    #[error("unknown tunable `{0}`")]
    UnknownTunable(String),

    /// The value could not be parsed for the named tunable.
    /// 无法为该参数解析给定的值。
    #[error("invalid value `{value}` for tunable `{name}`")]
    InvalidTunableValue { name: &'static str, value: String },

    /// The resulting configuration would break one of its invariants.
    /// 结果配置将破坏其不变量。
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// An algorithm with this name is already registered.
    /// 同名算法已注册。
    #[error("congestion control `{0}` is already registered")]
    AlreadyRegistered(String),

    /// No algorithm with this name is registered.
    /// 未注册该名称的算法。
    #[error("congestion control `{0}` is not registered")]
    NotRegistered(String),

    /// The algorithm is being deregistered and admits no new sessions.
    /// 算法正在注销，不再接纳新会话。
    #[error("congestion control `{0}` is draining and admits no new sessions")]
    Draining(String),

    /// Deregistration gave up waiting for sessions to drain.
    ///
    /// 注销放弃等待会话排空。
    #[error("congestion control `{name}` still has {remaining} active sessions")]
    SessionsStillActive { name: String, remaining: usize },
}

/// A specialized `Result` type for this library.
/// 本库专用的 `Result` 类型。
pub type Result<T> = std::result::Result<T, Error>;
