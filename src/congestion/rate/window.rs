//! Derives the congestion window and pacing rate from the target rate.
//! 由目标速率推导拥塞窗口与发送速率。
//!
//! `window = target_rate * rtt / segment_size * gain`, with slow-start
//! doubling on the way up and a +10% probe every 100th decision once out of
//! slow start.

use super::session::SessionState;
use super::{scale, scale32};
use crate::config::{CongestionControlConfig, GAIN_UNIT};
use crate::congestion::{TransportState, WindowDecision};
use tracing::{debug, trace};

/// RTT assumed while the transport has not measured one yet, 1ms.
pub const DEFAULT_RTT_US: u32 = 1_000;

/// Segment size assumed while the transport has not reported one (Ethernet MSS).
pub const DEFAULT_SEGMENT_SIZE: u32 = 1_460;

/// Decisions between two window-level bandwidth probes.
pub(crate) const WINDOW_PROBE_PERIOD: u32 = 100;

const MICROS_PER_SEC: u128 = 1_000_000;

impl SessionState {
    /// Computes this decision's window and pacing rate.
    ///
    /// 计算本次决策的窗口与发送速率。
    pub(super) fn compute_window(
        &mut self,
        cc: &CongestionControlConfig,
        transport: &TransportState,
    ) -> WindowDecision {
        let rtt_us = match transport.rtt_us {
            0 => DEFAULT_RTT_US,
            rtt => rtt,
        };
        let segment_size = match transport.segment_size {
            0 => DEFAULT_SEGMENT_SIZE,
            mss => mss,
        };
        let base = base_window(self.target_rate, rtt_us, segment_size, self.gain);

        let candidate = if self.slow_start_active && transport.window < transport.ssthresh {
            let doubled = transport.window.saturating_mul(2);
            if doubled >= base {
                self.slow_start_active = false;
                debug!(window = base, "Leaving slow start at the bandwidth-delay window");
                base
            } else {
                doubled
            }
        } else {
            self.probe_counter += 1;
            if self.probe_counter >= WINDOW_PROBE_PERIOD {
                self.probe_counter = 0;
                trace!(window = base, "Window-level bandwidth probe");
                scale32(base, 11, 10)
            } else {
                base
            }
        };

        let window = clamp_window(candidate, cc, transport.window_clamp);
        WindowDecision {
            window,
            pacing_rate: pacing_rate(self.target_rate),
        }
    }
}

/// The bandwidth-delay product in segments, scaled by `gain`. Divisions
/// truncate, in that order.
pub(crate) fn base_window(target_rate: u64, rtt_us: u32, segment_size: u32, gain: u32) -> u32 {
    let segments = u128::from(target_rate) * u128::from(rtt_us)
        / (u128::from(segment_size) * MICROS_PER_SEC);
    let scaled = segments * u128::from(gain) / u128::from(GAIN_UNIT);
    u32::try_from(scaled).unwrap_or(u32::MAX)
}

/// Bounds a window to `[min_window, max_window]` and the transport's clamp.
/// A zero clamp means the transport imposes none.
pub(crate) fn clamp_window(candidate: u32, cc: &CongestionControlConfig, window_clamp: u32) -> u32 {
    let window = candidate.max(cc.min_window).min(cc.max_window);
    match window_clamp {
        0 => window,
        clamp => window.min(clamp),
    }
}

/// Pacing runs 20% above the target rate to leave room for bursts.
pub(crate) fn pacing_rate(target_rate: u64) -> u64 {
    scale(target_rate, 12, 10)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::congestion::INFINITE_SSTHRESH;
    use tokio::time::Instant;

    fn config() -> CongestionControlConfig {
        CongestionControlConfig {
            rate_ceiling: 125_000_000,
            min_window: 4,
            max_window: 10_000,
            ..Default::default()
        }
    }

    fn transport(window: u32, ssthresh: u32) -> TransportState {
        TransportState {
            rtt_us: 10_000,
            segment_size: 1_000,
            window,
            ssthresh,
            window_clamp: 0,
        }
    }

    #[test]
    fn test_base_window_formula() {
        // 125MB/s * 10ms / 1000B = 1250 segments, times 1.5.
        assert_eq!(base_window(125_000_000, 10_000, 1_000, 15), 1_875);
        // The segment count truncates before the gain is applied.
        assert_eq!(base_window(125_000_000, 1_000, 1_460, 15), 127);
        assert_eq!(base_window(u64::MAX, u32::MAX, 1, 30), u32::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_start_doubles_then_exits_at_base() {
        let cc = config();
        let mut state = SessionState::new(&cc, Instant::now());
        state.gain = GAIN_UNIT;

        let decision = state.compute_window(&cc, &transport(10, INFINITE_SSTHRESH));
        assert_eq!(decision.window, 20);
        assert!(state.slow_start_active);

        let decision = state.compute_window(&cc, &transport(1_000, INFINITE_SSTHRESH));
        assert_eq!(decision.window, 1_250);
        assert!(!state.slow_start_active);
        assert_eq!(state.probe_counter, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_window_probe() {
        let cc = config();
        let mut state = SessionState::new(&cc, Instant::now());
        state.gain = GAIN_UNIT;
        state.slow_start_active = false;

        for _ in 0..99 {
            let decision = state.compute_window(&cc, &transport(1_250, 100));
            assert_eq!(decision.window, 1_250);
        }
        let decision = state.compute_window(&cc, &transport(1_250, 100));
        assert_eq!(decision.window, 1_375);
        assert_eq!(state.probe_counter, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_defaults_and_clamps() {
        let cc = config();
        let mut state = SessionState::new(&cc, Instant::now());
        state.slow_start_active = false;
        state.gain = GAIN_UNIT;

        let unmeasured = TransportState {
            rtt_us: 0,
            segment_size: 0,
            window: 10,
            ssthresh: 10,
            window_clamp: 50,
        };
        // 125MB/s * 1ms / 1460B = 85, capped by the transport's clamp.
        let decision = state.compute_window(&cc, &unmeasured);
        assert_eq!(decision.window, 50);
        assert_eq!(decision.pacing_rate, 150_000_000);

        state.target_rate = 1_000;
        let decision = state.compute_window(&cc, &unmeasured);
        assert_eq!(decision.window, cc.min_window);
    }

    #[test]
    fn test_clamp_window() {
        let cc = config();
        assert_eq!(clamp_window(1, &cc, 0), 4);
        assert_eq!(clamp_window(50_000, &cc, 0), 10_000);
        assert_eq!(clamp_window(500, &cc, 200), 200);
    }
}
