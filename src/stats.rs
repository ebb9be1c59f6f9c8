//! Statistics for diagnostics: process-wide aggregates and per-session snapshots.
//! 诊断统计：进程级汇总与会话快照。
//!
//! None of these values feed back into a congestion decision.

use crate::config::tunable::format_gain;
use crate::congestion::ReleaseSummary;
use crate::congestion::rate::AdaptState;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::warn;

/// Counters shared by every session of one registered algorithm.
///
/// Updated only at session boundaries: opening increments the session
/// counters, releasing folds the session's final counters in.
///
/// 同一注册算法所有会话共享的计数器。
#[derive(Debug, Default)]
pub struct GlobalStats {
    active_sessions: AtomicUsize,
    total_sessions: AtomicU64,
    total_bytes: AtomicU64,
    total_losses: AtomicU64,
}

impl GlobalStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn session_opened(&self) {
        self.active_sessions.fetch_add(1, Ordering::AcqRel);
        self.total_sessions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn session_released(&self, summary: &ReleaseSummary) {
        // Never wrap below zero, even if a caller double-releases.
        let result = self
            .active_sessions
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                count.checked_sub(1)
            });
        if result.is_err() {
            warn!("session released while no session was active; possible double release");
        }
        self.total_bytes
            .fetch_add(summary.bytes_sent, Ordering::Relaxed);
        self.total_losses
            .fetch_add(u64::from(summary.loss_count), Ordering::Relaxed);
    }

    pub fn active_sessions(&self) -> usize {
        self.active_sessions.load(Ordering::Acquire)
    }

    pub fn total_sessions(&self) -> u64 {
        self.total_sessions.load(Ordering::Relaxed)
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes.load(Ordering::Relaxed)
    }

    pub fn total_losses(&self) -> u64 {
        self.total_losses.load(Ordering::Relaxed)
    }
}

impl fmt::Display for GlobalStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sessions={} (total {}) bytes={} losses={}",
            self.active_sessions(),
            self.total_sessions(),
            format_bytes(self.total_bytes()),
            self.total_losses(),
        )
    }
}

/// A point-in-time copy of one session's controller state.
///
/// 某一会话控制器状态的时间点副本。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    pub state: AdaptState,
    pub target_rate: u64,
    pub measured_rate: u64,
    /// Fixed-point x10.
    pub gain: u32,
    pub loss_count: u32,
    pub rtt_min_us: u32,
    pub sample_count: u32,
    pub slow_start_active: bool,
    pub probe_counter: u32,
    pub bytes_sent: u64,
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rate[{:?}] target={}/s measured={}/s gain={} losses={} rtt_min={}us",
            self.state,
            format_bytes(self.target_rate),
            format_bytes(self.measured_rate),
            format_gain(self.gain),
            self.loss_count,
            self.rtt_min_us,
        )
    }
}

/// Format bytes in human-readable form.
fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_000_000 {
        format!("{:.1}MB", bytes as f64 / 1_000_000.0)
    } else if bytes >= 1_000 {
        format!("{:.1}KB", bytes as f64 / 1_000.0)
    } else {
        format!("{}B", bytes)
    }
}
