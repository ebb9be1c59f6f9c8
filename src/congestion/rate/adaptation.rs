//! The Probing / Cruising / Avoiding rate adaptation state machine.
//! 探测 / 巡航 / 避让 三态速率自适应状态机。
//!
//! Runs once per valid feedback sample and sets the session's target rate and
//! gain. Multiplicative increase and decrease are keyed off the measured
//! bandwidth rather than loss alone; the rate floor and ceiling keep the
//! controller from running away or stalling.

use super::{scale, scale32};
use super::session::{AdaptState, SessionState};
use crate::config::{CongestionControlConfig, GAIN_UNIT};
use crate::congestion::FeedbackSample;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Fixed slack added on top of the inflated RTT baseline.
const RTT_INFLATION_SLACK_US: u64 = 1_000;

/// Cruising re-enters Probing after this long, to notice a grown bottleneck.
pub(crate) const CRUISE_REPROBE_INTERVAL: Duration = Duration::from_millis(200);

impl SessionState {
    /// Whether the sample carries a congestion signal: RTT inflated more than
    /// 20% + 1ms over the baseline, or any loss. Turbo mode never sees one.
    ///
    /// 样本是否携带拥塞信号。涡轮模式下永远不会。
    pub(super) fn is_congested(
        &self,
        cc: &CongestionControlConfig,
        rtt_us: u32,
        sample: &FeedbackSample,
    ) -> bool {
        if cc.turbo_enabled {
            return false;
        }
        let rtt_inflated = self.rtt_min_us > 0
            && u64::from(rtt_us)
                > scale(u64::from(self.rtt_min_us), 12, 10) + RTT_INFLATION_SLACK_US;
        rtt_inflated || sample.losses_in_sample > 0
    }

    /// Pins target rate and gain to their ceilings, bypassing the state
    /// machine. Used while adaptation is disabled.
    pub(super) fn pin_to_ceiling(&mut self, cc: &CongestionControlConfig) {
        self.target_rate = cc.rate_ceiling;
        self.gain = cc.gain_ceiling.max(GAIN_UNIT);
    }

    /// Advances the state machine for one valid sample and applies the
    /// per-state rate and gain update, then clamps both.
    ///
    /// 为一个有效样本推进状态机并应用对应状态的速率与增益更新，最后进行钳制。
    pub(super) fn adapt(
        &mut self,
        cc: &CongestionControlConfig,
        rtt_us: u32,
        sample: &FeedbackSample,
        now: Instant,
    ) {
        let congested = self.is_congested(cc, rtt_us, sample);

        if let Some(next) = self.next_state(congested) {
            trace!(from = ?self.adapt_state, to = ?next, congested, "Adaptation state change");
            if next == AdaptState::Cruising {
                self.last_cruise_time = now;
            }
            self.adapt_state = next;
        }

        match self.adapt_state {
            AdaptState::Probing => {
                self.target_rate = scale(self.target_rate, 11, 10);
                self.gain = self.gain.saturating_add(1).min(cc.gain_ceiling);
            }
            AdaptState::Cruising => {
                self.target_rate = scale(self.measured_rate, 11, 10);
                if now.saturating_duration_since(self.last_cruise_time) > CRUISE_REPROBE_INTERVAL {
                    trace!("Cruise interval elapsed, re-probing");
                    self.adapt_state = AdaptState::Probing;
                }
            }
            AdaptState::Avoiding => {
                self.target_rate = scale(self.measured_rate, 9, 10).max(cc.rate_ceiling / 10);
                self.gain = scale32(self.gain, 8, 10).max(GAIN_UNIT);
            }
        }

        self.clamp(cc);

        trace!(
            state = ?self.adapt_state,
            target_rate = self.target_rate,
            measured_rate = self.measured_rate,
            gain = self.gain,
            "Rate adapted"
        );
    }

    /// The transition table, in priority order.
    fn next_state(&self, congested: bool) -> Option<AdaptState> {
        match (self.adapt_state, congested) {
            (AdaptState::Probing | AdaptState::Cruising, true) => Some(AdaptState::Avoiding),
            (AdaptState::Probing, false)
                if self.measured_rate > scale(self.target_rate, 9, 10) =>
            {
                Some(AdaptState::Cruising)
            }
            (AdaptState::Avoiding, false) => Some(AdaptState::Probing),
            (AdaptState::Probing, false)
            | (AdaptState::Cruising, false)
            | (AdaptState::Avoiding, true) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CongestionControlConfig {
        CongestionControlConfig {
            rate_ceiling: 125_000_000,
            gain_ceiling: 30,
            initial_gain: Some(15),
            ..Default::default()
        }
    }

    fn quiet(delivered: u64) -> FeedbackSample {
        FeedbackSample::new(delivered, 100_000, 0)
    }

    #[tokio::test(start_paused = true)]
    async fn test_probing_grows_rate_and_gain() {
        let cc = config();
        let now = Instant::now();
        let mut state = SessionState::new(&cc, now);
        state.target_rate = 50_000_000;
        state.measured_rate = 1_500_000;

        state.adapt(&cc, 1_000, &quiet(150_000), now);

        assert_eq!(state.adapt_state, AdaptState::Probing);
        assert_eq!(state.target_rate, 55_000_000);
        assert_eq!(state.gain, 16);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probing_enters_cruising_near_target() {
        let cc = config();
        let now = Instant::now();
        let mut state = SessionState::new(&cc, now);
        state.target_rate = 10_000_000;
        state.measured_rate = 9_500_000;

        state.adapt(&cc, 1_000, &quiet(950_000), now);

        assert_eq!(state.adapt_state, AdaptState::Cruising);
        assert_eq!(state.last_cruise_time, now);
        assert_eq!(state.target_rate, 10_450_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rtt_inflation_enters_avoiding() {
        let cc = config();
        let now = Instant::now();
        let mut state = SessionState::new(&cc, now);
        state.rtt_min_us = 10_000;
        state.gain = 20;
        state.measured_rate = 80_000_000;

        // 10ms * 1.2 + 1ms = 13ms; 13ms itself is not yet congestion.
        assert!(!state.is_congested(&cc, 13_000, &quiet(1)));
        state.adapt(&cc, 13_001, &quiet(8_000_000), now);

        assert_eq!(state.adapt_state, AdaptState::Avoiding);
        assert_eq!(state.target_rate, 72_000_000);
        assert_eq!(state.gain, 16);
    }

    #[tokio::test(start_paused = true)]
    async fn test_avoiding_respects_rate_floor() {
        let cc = config();
        let now = Instant::now();
        let mut state = SessionState::new(&cc, now);
        state.measured_rate = 1_000;

        state.adapt(&cc, 1_000, &FeedbackSample::new(100, 100_000, 3), now);

        assert_eq!(state.adapt_state, AdaptState::Avoiding);
        assert_eq!(state.target_rate, 12_500_000);

        // Staying congested keeps the state; the gain floors at 1.0x.
        for _ in 0..20 {
            state.adapt(&cc, 1_000, &FeedbackSample::new(100, 100_000, 1), now);
        }
        assert_eq!(state.adapt_state, AdaptState::Avoiding);
        assert_eq!(state.gain, GAIN_UNIT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_avoiding_returns_to_probing_when_clear() {
        let cc = config();
        let now = Instant::now();
        let mut state = SessionState::new(&cc, now);
        state.adapt_state = AdaptState::Avoiding;
        state.target_rate = 20_000_000;
        state.measured_rate = 1_000_000;

        state.adapt(&cc, 1_000, &quiet(100_000), now);

        assert_eq!(state.adapt_state, AdaptState::Probing);
        assert_eq!(state.target_rate, 22_000_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cruising_reprobes_after_interval() {
        let cc = config();
        let t0 = Instant::now();
        let mut state = SessionState::new(&cc, t0);
        state.adapt_state = AdaptState::Cruising;
        state.last_cruise_time = t0;
        state.measured_rate = 40_000_000;

        state.adapt(&cc, 1_000, &quiet(4_000_000), t0 + Duration::from_millis(200));
        assert_eq!(state.adapt_state, AdaptState::Cruising);
        assert_eq!(state.target_rate, 44_000_000);

        state.adapt(&cc, 1_000, &quiet(4_000_000), t0 + Duration::from_millis(201));
        assert_eq!(state.adapt_state, AdaptState::Probing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_turbo_ignores_congestion() {
        let cc = CongestionControlConfig {
            turbo_enabled: true,
            ..config()
        };
        let now = Instant::now();
        let mut state = SessionState::new(&cc, now);
        state.rtt_min_us = 1_000;

        assert!(!state.is_congested(&cc, 500_000, &FeedbackSample::new(1, 1, 50)));
        state.adapt(&cc, 500_000, &FeedbackSample::new(1, 1, 50), now);
        assert_ne!(state.adapt_state, AdaptState::Avoiding);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pin_to_ceiling() {
        let cc = config();
        let mut state = SessionState::new(&cc, Instant::now());
        state.target_rate = 7;
        state.gain = 11;

        state.pin_to_ceiling(&cc);
        assert_eq!(state.target_rate, 125_000_000);
        assert_eq!(state.gain, 30);
    }
}
