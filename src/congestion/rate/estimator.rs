//! Turns feedback samples into a bandwidth estimate and tracks the RTT baseline.
//! 将反馈样本转换为带宽估计，并跟踪 RTT 基线。

use super::session::SessionState;
use crate::congestion::FeedbackSample;
use tracing::trace;

const MICROS_PER_SEC: u128 = 1_000_000;

impl SessionState {
    /// Folds the transport's current RTT into the baseline. Returns whether
    /// the RTT was a usable measurement.
    ///
    /// 将传输层当前 RTT 并入基线。返回该 RTT 是否为有效测量。
    pub(super) fn observe_rtt(&mut self, rtt_us: u32) -> bool {
        if rtt_us == 0 {
            return false;
        }
        if self.rtt_min_us == 0 || rtt_us < self.rtt_min_us {
            trace!(rtt_us, previous_us = self.rtt_min_us, "New RTT baseline");
            self.rtt_min_us = rtt_us;
        }
        self.sample_count = self.sample_count.wrapping_add(1);
        true
    }

    /// Computes the delivered bandwidth of `sample` in bytes per second and
    /// records it. Invalid samples leave the state untouched.
    ///
    /// 计算 `sample` 的交付带宽（字节/秒）并记录。无效样本不修改状态。
    pub(super) fn estimate_bandwidth(&mut self, sample: &FeedbackSample) -> Option<u64> {
        if !sample.is_valid() {
            trace!(?sample, "Discarding invalid feedback sample");
            return None;
        }

        let bandwidth = u128::from(sample.delivered_bytes) * MICROS_PER_SEC
            / u128::from(sample.interval_us);
        let bandwidth = u64::try_from(bandwidth).unwrap_or(u64::MAX);

        self.measured_rate = bandwidth;
        self.bytes_sent = self.bytes_sent.saturating_add(sample.delivered_bytes);
        Some(bandwidth)
    }
}
