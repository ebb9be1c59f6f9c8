//! The host-facing handle of one congestion-controlled session.
//! 宿主侧的单个拥塞控制会话句柄。

use crate::congestion::{
    CaEvent, CaState, CongestionControl, FeedbackSample, RateController, ReleaseSummary,
    TransportState, WindowDecision,
};
use crate::registry::Registration;
use crate::stats::SessionStats;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Binds one [`RateController`] to the registration it was admitted by.
///
/// Every call reads the registration's latest configuration snapshot, so
/// operator changes apply from the next decision on. Dropping the session
/// releases it.
///
/// 将一个 [`RateController`] 绑定到接纳它的注册项。每次调用都读取最新的配置快照。
#[derive(Debug)]
pub struct Session {
    controller: RateController,
    registration: Arc<Registration>,
}

impl Session {
    /// Opens a session and returns it with the transport's initial
    /// slow-start threshold.
    pub(crate) fn open(
        registration: Arc<Registration>,
        current_window: u32,
        now: Instant,
    ) -> (Self, u32) {
        let mut controller = RateController::new(registration.stats_handle());
        let ssthresh = controller.init(&registration.config().snapshot(), current_window, now);
        (
            Self {
                controller,
                registration,
            },
            ssthresh,
        )
    }

    /// Runs one feedback sample through the controller.
    ///
    /// 将一个反馈样本交给控制器处理。
    pub fn on_feedback_sample(
        &mut self,
        transport: &TransportState,
        sample: &FeedbackSample,
        now: Instant,
    ) -> WindowDecision {
        let config = self.registration.config().snapshot();
        self.controller
            .on_feedback_sample(&config, transport, sample, now)
    }

    pub fn on_state_transition(&mut self, state: CaState) -> Option<u32> {
        let config = self.registration.config().snapshot();
        self.controller.on_state_transition(&config, state)
    }

    pub fn query_loss_threshold(&mut self, current_window: u32) -> u32 {
        let config = self.registration.config().snapshot();
        self.controller.query_loss_threshold(&config, current_window)
    }

    pub fn undo_retreat(&mut self, current_window: u32, prior_window: u32) -> u32 {
        self.controller.undo_retreat(current_window, prior_window)
    }

    pub fn on_event(&mut self, event: CaEvent) {
        let config = self.registration.config().snapshot();
        self.controller.on_event(&config, event);
    }

    /// Releases the session, folding its counters into the registration's
    /// aggregates. Later calls return zeros.
    ///
    /// 释放会话，将其计数并入注册项的汇总。之后的调用返回零。
    pub fn release(&mut self) -> ReleaseSummary {
        self.controller.release()
    }

    pub fn stats(&self) -> Option<SessionStats> {
        self.controller.session_stats()
    }

    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.controller.elapsed(now)
    }

    /// The name of the algorithm this session was admitted by.
    pub fn algorithm(&self) -> &str {
        self.registration.name()
    }
}
