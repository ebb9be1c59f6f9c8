//! tests/common/harness.rs
#![allow(dead_code)]

use kestrel_rate::config::ConfigStore;
use kestrel_rate::congestion::{FeedbackSample, TransportState, WindowDecision};
use kestrel_rate::registry::{Registration, Registry};
use kestrel_rate::session::Session;
use std::sync::{Arc, Once};
use std::time::Duration;
use tokio::time::Instant;

pub const ALGORITHM: &str = "kestrel_rate";

/// Initializes tracing for tests, ensuring it's only done once.
pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter =
            std::env::var("RUST_LOG").unwrap_or_else(|_| "kestrel_rate=debug".to_string());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}

/// A registry with the rate controller registered against a fresh store.
pub struct TestHarness {
    pub registry: Arc<Registry>,
    pub config: Arc<ConfigStore>,
    pub registration: Arc<Registration>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(ConfigStore::default())
    }

    pub fn with_config(config: ConfigStore) -> Self {
        init_tracing();
        let registry = Arc::new(Registry::new());
        let config = Arc::new(config);
        let registration = registry.register(ALGORITHM, Arc::clone(&config)).unwrap();
        Self {
            registry,
            config,
            registration,
        }
    }

    /// Opens a session wrapped in a simulated host transport.
    pub fn connect(&self, link: Link) -> SimulatedTransport {
        let (session, ssthresh) = self
            .registry
            .open_session(ALGORITHM, link.initial_window, Instant::now())
            .unwrap();
        SimulatedTransport::new(session, ssthresh, link)
    }
}

/// A single-bottleneck path.
#[derive(Debug, Clone, Copy)]
pub struct Link {
    /// Bottleneck capacity in bytes per second.
    pub capacity: u64,
    pub base_rtt: Duration,
    pub segment_size: u32,
    pub initial_window: u32,
    pub window_clamp: u32,
}

impl Default for Link {
    fn default() -> Self {
        Self {
            capacity: 12_500_000,
            base_rtt: Duration::from_millis(10),
            segment_size: 1_460,
            initial_window: 10,
            window_clamp: 0,
        }
    }
}

/// A host transport: applies every decision and reports what the link
/// delivered during one round trip.
pub struct SimulatedTransport {
    pub session: Session,
    pub link: Link,
    pub window: u32,
    pub ssthresh: u32,
    pub decisions: Vec<WindowDecision>,
}

impl SimulatedTransport {
    fn new(session: Session, ssthresh: u32, link: Link) -> Self {
        Self {
            session,
            link,
            window: link.initial_window,
            ssthresh,
            decisions: Vec::new(),
        }
    }

    /// Sends for one round trip, feeds the sample back and applies the decision.
    pub fn round_trip(&mut self) -> WindowDecision {
        let base_rtt_us = u64::try_from(self.link.base_rtt.as_micros()).unwrap();
        let offered = u64::from(self.window) * u64::from(self.link.segment_size) * 1_000_000
            / base_rtt_us.max(1);

        // Sending faster than the bottleneck queues the excess, which shows
        // up as extra delay, and drops whatever exceeds one more RTT of queue.
        let (rtt_us, delivered_rate, losses) = if offered > self.link.capacity {
            let excess = offered - self.link.capacity;
            let queue_delay_us = base_rtt_us * excess / self.link.capacity;
            let losses = u32::from(excess > self.link.capacity);
            (base_rtt_us + queue_delay_us.min(base_rtt_us), self.link.capacity, losses)
        } else {
            (base_rtt_us, offered, 0)
        };

        let delivered = delivered_rate * rtt_us / 1_000_000;
        let transport = TransportState {
            rtt_us: u32::try_from(rtt_us).unwrap(),
            segment_size: self.link.segment_size,
            window: self.window,
            ssthresh: self.ssthresh,
            window_clamp: self.link.window_clamp,
        };
        let sample = FeedbackSample::new(delivered, rtt_us, losses);

        let decision = self
            .session
            .on_feedback_sample(&transport, &sample, Instant::now());
        self.window = decision.window;
        self.decisions.push(decision);
        decision
    }

    pub fn run(&mut self, round_trips: usize) -> WindowDecision {
        let mut last = WindowDecision {
            window: self.window,
            pacing_rate: 0,
        };
        for _ in 0..round_trips {
            last = self.round_trip();
        }
        last
    }
}
