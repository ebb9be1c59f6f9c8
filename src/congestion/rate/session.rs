//! Per-session controller state.
//! 每个会话的控制器状态。

use crate::config::{CongestionControlConfig, GAIN_UNIT};
use crate::stats::SessionStats;
use tokio::time::Instant;

/// The three modes of the rate adaptation state machine.
///
/// 速率自适应状态机的三种模式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptState {
    /// Growing the target rate to find the bottleneck.
    /// 探测阶段：提高目标速率以寻找瓶颈。
    Probing,
    /// Tracking the measured bandwidth with a little headroom.
    /// 巡航阶段：以少量余量跟踪测得带宽。
    Cruising,
    /// Backing off after a congestion signal.
    /// 避让阶段：在拥塞信号后退让。
    Avoiding,
}

/// Mutable state of one session, owned by that session's controller.
#[derive(Debug, Clone)]
pub(crate) struct SessionState {
    /// Bytes per second the session aims for.
    pub(super) target_rate: u64,
    /// Bandwidth of the last valid feedback sample, bytes per second.
    pub(super) measured_rate: u64,
    /// Window gain, fixed-point x10.
    pub(super) gain: u32,
    pub(super) loss_count: u32,
    /// Lowest RTT seen, 0 until the first measurement.
    pub(super) rtt_min_us: u32,
    /// Valid RTT observations so far.
    pub(super) sample_count: u32,
    pub(super) slow_start_active: bool,
    /// Decisions since the last window-level probe.
    pub(super) probe_counter: u32,
    pub(super) bytes_sent: u64,
    pub(super) start_time: Instant,
    pub(super) adapt_state: AdaptState,
    pub(super) last_cruise_time: Instant,
}

impl SessionState {
    pub(super) fn new(cc: &CongestionControlConfig, now: Instant) -> Self {
        Self {
            target_rate: cc.rate_ceiling,
            measured_rate: 0,
            gain: clamp_gain(cc.starting_gain(), cc.gain_ceiling),
            loss_count: 0,
            rtt_min_us: 0,
            sample_count: 0,
            slow_start_active: true,
            probe_counter: 0,
            bytes_sent: 0,
            start_time: now,
            adapt_state: AdaptState::Probing,
            last_cruise_time: now,
        }
    }

    /// Brings target rate and gain back inside the configured bounds.
    pub(super) fn clamp(&mut self, cc: &CongestionControlConfig) {
        self.target_rate = self.target_rate.max(cc.rate_floor()).min(cc.rate_ceiling);
        self.gain = clamp_gain(self.gain, cc.gain_ceiling);
    }

    pub(super) fn stats(&self) -> SessionStats {
        SessionStats {
            state: self.adapt_state,
            target_rate: self.target_rate,
            measured_rate: self.measured_rate,
            gain: self.gain,
            loss_count: self.loss_count,
            rtt_min_us: self.rtt_min_us,
            sample_count: self.sample_count,
            slow_start_active: self.slow_start_active,
            probe_counter: self.probe_counter,
            bytes_sent: self.bytes_sent,
        }
    }
}

/// Clamps a gain into `[1.0x, ceiling]`. A ceiling below 1.0x is read as 1.0x.
pub(super) fn clamp_gain(gain: u32, ceiling: u32) -> u32 {
    gain.min(ceiling).max(GAIN_UNIT)
}
