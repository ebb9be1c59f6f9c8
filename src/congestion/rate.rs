//! A rate-adaptive congestion controller.
//!
//! The controller blends slow start, bandwidth probing, steady-state cruising
//! and congestion avoidance into one window and pacing-rate decision per
//! feedback sample. All quantities are integers: rates in bytes per second,
//! gains in fixed-point tenths, and every division truncates.
//!
//! 速率自适应拥塞控制器。
//!
//! 控制器将慢启动、带宽探测、稳态巡航和拥塞避免融合为每个反馈样本一次的
//! 窗口与发送速率决策。所有量均为整数，所有除法均截断。

mod adaptation;
mod estimator;
mod recovery;
mod session;
mod window;

pub use session::AdaptState;
pub use window::{DEFAULT_RTT_US, DEFAULT_SEGMENT_SIZE};

use self::session::SessionState;
use crate::config::Config;
use crate::congestion::{
    CaEvent, CaState, CongestionControl, FeedbackSample, INFINITE_SSTHRESH, ReleaseSummary,
    TransportState, WindowDecision,
};
use crate::stats::{GlobalStats, SessionStats};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

/// RTT samples between two periodic diagnostics.
const DIAGNOSTIC_PERIOD: u32 = 100;

/// The rate-adaptive congestion controller of one session.
///
/// Holds no state until [`CongestionControl::init`] and none again after
/// [`CongestionControl::release`]; every other call tolerates both.
///
/// 单个会话的速率自适应拥塞控制器。
#[derive(Debug)]
pub struct RateController {
    state: Option<SessionState>,
    stats: Arc<GlobalStats>,
}

impl RateController {
    /// The name this algorithm registers under.
    pub const NAME: &'static str = "kestrel_rate";

    /// Creates an uninitialized controller reporting into `stats`.
    ///
    /// 创建一个向 `stats` 汇报的未初始化控制器。
    pub fn new(stats: Arc<GlobalStats>) -> Self {
        Self { state: None, stats }
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// A snapshot of the session's state, if initialized.
    pub fn session_stats(&self) -> Option<SessionStats> {
        self.state.as_ref().map(SessionState::stats)
    }

    /// The current adaptation mode, if initialized.
    pub fn adapt_state(&self) -> Option<AdaptState> {
        self.state.as_ref().map(|state| state.adapt_state)
    }

    /// Time since the session was initialized.
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.state
            .as_ref()
            .map(|state| now.saturating_duration_since(state.start_time))
    }
}

impl CongestionControl for RateController {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn init(&mut self, config: &Config, current_window: u32, now: Instant) -> u32 {
        let cc = &config.congestion_control;
        if self.state.replace(SessionState::new(cc, now)).is_none() {
            self.stats.session_opened();
        } else {
            debug!("Re-initializing a live session; its counters start over");
        }

        let ssthresh = if cc.turbo_enabled {
            INFINITE_SSTHRESH
        } else {
            current_window.saturating_mul(2)
        };
        debug!(
            target_rate = cc.rate_ceiling,
            gain = cc.starting_gain(),
            ssthresh,
            "Session initialized"
        );
        ssthresh
    }

    fn on_feedback_sample(
        &mut self,
        config: &Config,
        transport: &TransportState,
        sample: &FeedbackSample,
        now: Instant,
    ) -> WindowDecision {
        let cc = &config.congestion_control;
        let Some(state) = self.state.as_mut() else {
            trace!("Feedback sample for an uninitialized session");
            return WindowDecision {
                window: window::clamp_window(transport.window, cc, transport.window_clamp),
                pacing_rate: window::pacing_rate(cc.rate_ceiling),
            };
        };

        let rtt_observed = state.observe_rtt(transport.rtt_us);
        let bandwidth = state.estimate_bandwidth(sample);

        if !cc.adaptive_enabled {
            state.pin_to_ceiling(cc);
        } else if bandwidth.is_some() {
            state.adapt(cc, transport.rtt_us, sample, now);
        } else {
            // Ceilings may have moved since the last valid sample.
            state.clamp(cc);
        }

        let decision = state.compute_window(cc, transport);

        if config.verbosity >= 2 && rtt_observed && state.sample_count % DIAGNOSTIC_PERIOD == 0 {
            debug!(
                window = decision.window,
                pacing_rate = decision.pacing_rate,
                rtt_us = transport.rtt_us,
                gain = state.gain,
                losses = state.loss_count,
                state = ?state.adapt_state,
                "Periodic decision"
            );
        }
        decision
    }

    fn on_state_transition(&mut self, config: &Config, state: CaState) -> Option<u32> {
        let cc = &config.congestion_control;
        match self.state.as_mut() {
            Some(session) => {
                session.clamp(cc);
                session.on_state_transition(cc, state)
            }
            None if cc.turbo_enabled && state == CaState::Loss => Some(INFINITE_SSTHRESH),
            None => None,
        }
    }

    fn query_loss_threshold(&mut self, config: &Config, current_window: u32) -> u32 {
        let cc = &config.congestion_control;
        match self.state.as_mut() {
            Some(session) => {
                session.clamp(cc);
                session.query_loss_threshold(cc, current_window)
            }
            None if cc.turbo_enabled => INFINITE_SSTHRESH,
            None => recovery::loss_threshold(cc, current_window),
        }
    }

    fn undo_retreat(&mut self, current_window: u32, prior_window: u32) -> u32 {
        match self.state.as_mut() {
            Some(session) => session.undo_retreat(current_window, prior_window),
            None => current_window.max(prior_window),
        }
    }

    fn on_event(&mut self, config: &Config, event: CaEvent) {
        if let Some(session) = self.state.as_mut() {
            session.clamp(&config.congestion_control);
            session.on_event(&config.congestion_control, event);
        }
    }

    fn release(&mut self) -> ReleaseSummary {
        let Some(state) = self.state.take() else {
            return ReleaseSummary::default();
        };
        let summary = ReleaseSummary {
            loss_count: state.loss_count,
            bytes_sent: state.bytes_sent,
        };
        self.stats.session_released(&summary);
        debug!(
            losses = summary.loss_count,
            bytes_sent = summary.bytes_sent,
            "Session released"
        );
        summary
    }
}

impl Drop for RateController {
    fn drop(&mut self) {
        // Keeps the shared session count honest for hosts that never release.
        self.release();
    }
}

impl Default for RateController {
    fn default() -> Self {
        Self::new(Arc::new(GlobalStats::new()))
    }
}

/// `value * num / den` without intermediate overflow, saturating at `u64::MAX`.
fn scale(value: u64, num: u64, den: u64) -> u64 {
    let scaled = u128::from(value) * u128::from(num) / u128::from(den);
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

/// `value * num / den` for 32-bit quantities, saturating at `u32::MAX`.
fn scale32(value: u32, num: u64, den: u64) -> u32 {
    let scaled = u64::from(value) * num / den;
    u32::try_from(scaled).unwrap_or(u32::MAX)
}
