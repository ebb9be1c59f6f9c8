//! Reactions to the transport's loss/recovery transitions and discrete events.
//! 对传输层丢包/恢复状态切换及离散事件的响应。

use super::scale32;
use super::session::{SessionState, clamp_gain};
use crate::config::{CongestionControlConfig, GAIN_UNIT};
use crate::congestion::{CaEvent, CaState, INFINITE_SSTHRESH};
use tracing::{debug, trace};

/// Gain floor while in recovery, 1.5x.
const RECOVERY_GAIN_FLOOR: u32 = 15;

/// Fixed gain step taken off on a discrete loss event, 0.5x.
const LOSS_EVENT_GAIN_STEP: u32 = 5;

impl SessionState {
    /// Reacts to a loss/recovery state transition. Returns the slow-start
    /// threshold the transport must adopt, if any.
    ///
    /// 响应丢包/恢复状态切换。返回传输层必须采用的慢启动阈值（如有）。
    pub(super) fn on_state_transition(
        &mut self,
        cc: &CongestionControlConfig,
        state: CaState,
    ) -> Option<u32> {
        match state {
            CaState::Loss => {
                if cc.turbo_enabled {
                    trace!("Turbo: ignoring loss state");
                    return Some(INFINITE_SSTHRESH);
                }
                self.loss_count = self.loss_count.saturating_add(1);
                self.retreat(cc, 8);
                debug!(gain = self.gain, losses = self.loss_count, "Entered loss state");
            }
            CaState::Recovery => {
                if !cc.turbo_enabled {
                    // The floor may lift a gain that was below 1.5x.
                    self.gain = clamp_gain(
                        scale32(self.gain, 9, 10).max(RECOVERY_GAIN_FLOOR),
                        cc.gain_ceiling,
                    );
                    debug!(gain = self.gain, "Entered recovery");
                }
            }
            CaState::Open => {
                self.slow_start_active = false;
            }
            CaState::Disorder | CaState::Cwr => {}
        }
        None
    }

    /// Counts a loss, retreats the gain and returns the new slow-start
    /// threshold: 70% of the current window, never below `min_window`.
    ///
    /// 记录一次丢包，降低增益并返回新的慢启动阈值。
    pub(super) fn query_loss_threshold(
        &mut self,
        cc: &CongestionControlConfig,
        current_window: u32,
    ) -> u32 {
        if cc.turbo_enabled {
            return INFINITE_SSTHRESH;
        }
        self.loss_count = self.loss_count.saturating_add(1);
        self.retreat(cc, 8);
        loss_threshold(cc, current_window)
    }

    /// Forgets a loss that turned out to be spurious and returns the window
    /// to restore.
    pub(super) fn undo_retreat(&mut self, current_window: u32, prior_window: u32) -> u32 {
        self.loss_count = 0;
        self.slow_start_active = false;
        current_window.max(prior_window)
    }

    pub(super) fn on_event(&mut self, cc: &CongestionControlConfig, event: CaEvent) {
        match event {
            CaEvent::Loss => {
                self.loss_count = self.loss_count.saturating_add(1);
                if !cc.turbo_enabled {
                    self.gain = clamp_gain(
                        self.gain.saturating_sub(LOSS_EVENT_GAIN_STEP),
                        cc.gain_ceiling,
                    );
                }
            }
            CaEvent::TransmissionStart => {
                self.slow_start_active = true;
                self.probe_counter = 0;
            }
            CaEvent::WindowRestart => {
                // An idle period invalidates what was learned about the path.
                self.slow_start_active = true;
                self.loss_count = 0;
                self.probe_counter = 0;
            }
            CaEvent::CompleteCwr => {}
        }
        trace!(?event, gain = self.gain, losses = self.loss_count, "Congestion event");
    }

    /// Multiplies the gain by `tenths / 10`, never below 1.0x.
    fn retreat(&mut self, cc: &CongestionControlConfig, tenths: u64) {
        self.gain = clamp_gain(scale32(self.gain, tenths, 10).max(GAIN_UNIT), cc.gain_ceiling);
    }
}

/// The post-loss slow-start threshold for `current_window`.
pub(crate) fn loss_threshold(cc: &CongestionControlConfig, current_window: u32) -> u32 {
    scale32(current_window, 7, 10).max(cc.min_window)
}
