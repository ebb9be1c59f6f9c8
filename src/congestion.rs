//! Defines the pluggable congestion control interface offered to the host
//! transport.
//! 定义了提供给宿主传输层的可插拔拥塞控制接口。

use crate::config::Config;
use tokio::time::Instant;

pub mod rate;

pub use rate::RateController;

/// The slow-start threshold value a transport treats as "no threshold".
///
/// 传输层视为“无阈值”的慢启动阈值。
pub const INFINITE_SSTHRESH: u32 = 0x7fff_ffff;

/// The transport's own loss/recovery classification, driven externally.
///
/// 传输层自身的丢包/恢复状态分类，由外部驱动。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaState {
    /// Nothing is outstanding as lost.
    /// 正常状态。
    Open,
    /// Duplicate acknowledgements or reordering were seen.
    Disorder,
    /// The window is being reduced in response to an explicit notification.
    Cwr,
    /// Fast recovery is repairing a loss.
    /// 快速恢复阶段。
    Recovery,
    /// A retransmission timeout fired.
    /// 超时丢包阶段。
    Loss,
}

/// Discrete congestion events reported by the transport.
///
/// 传输层报告的离散拥塞事件。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaEvent {
    /// A loss was detected.
    Loss,
    /// The first transmission after the pipe was empty.
    TransmissionStart,
    /// The window is restarted after an idle period.
    WindowRestart,
    /// A window reduction finished.
    CompleteCwr,
}

/// What the transport currently knows about the connection, handed to the
/// controller on every decision. Zero means "not measured yet".
///
/// 每次决策时传输层提供的连接信息。零表示“尚未测量”。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportState {
    /// Smoothed round-trip time, in microseconds.
    pub rtt_us: u32,
    /// Segment size, in bytes.
    pub segment_size: u32,
    /// Current congestion window, in segments.
    pub window: u32,
    /// Current slow-start threshold, in segments.
    pub ssthresh: u32,
    /// Upper bound the transport imposes on the window. Zero leaves it unbounded.
    pub window_clamp: u32,
}

/// A periodic measurement of bytes delivered over an interval.
///
/// 一段时间间隔内交付字节数的周期性测量。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedbackSample {
    pub delivered_bytes: u64,
    pub interval_us: u64,
    pub losses_in_sample: u32,
}

impl FeedbackSample {
    pub fn new(delivered_bytes: u64, interval_us: u64, losses_in_sample: u32) -> Self {
        Self {
            delivered_bytes,
            interval_us,
            losses_in_sample,
        }
    }

    /// Only samples with delivered bytes over a non-empty interval carry a
    /// bandwidth estimate.
    pub fn is_valid(&self) -> bool {
        self.delivered_bytes > 0 && self.interval_us > 0
    }
}

/// The window and pacing rate the transport should apply.
///
/// 传输层应当应用的窗口与发送速率。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowDecision {
    /// Congestion window, in segments.
    pub window: u32,
    /// Pacing rate, in bytes per second.
    pub pacing_rate: u64,
}

/// Final per-session counters, folded into the shared aggregates on release.
///
/// 会话最终计数，在释放时并入共享汇总。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseSummary {
    pub loss_count: u32,
    pub bytes_sent: u64,
}

/// A trait for congestion control algorithms driven by a host transport.
///
/// Calls for one session are serialized by the host. Every call receives the
/// configuration snapshot it should decide with; none of them can fail.
///
/// 由宿主传输层驱动的拥塞控制算法的 trait。
pub trait CongestionControl: Send + Sync + 'static {
    /// The name the algorithm registers under.
    fn name(&self) -> &'static str;

    /// Seeds the session state and returns the initial slow-start threshold.
    ///
    /// 初始化会话状态并返回初始慢启动阈值。
    fn init(&mut self, config: &Config, current_window: u32, now: Instant) -> u32;

    /// Called once per feedback sample; returns the window and pacing rate.
    ///
    /// 每个反馈样本调用一次；返回窗口与发送速率。
    fn on_feedback_sample(
        &mut self,
        config: &Config,
        transport: &TransportState,
        sample: &FeedbackSample,
        now: Instant,
    ) -> WindowDecision;

    /// Called when the transport changes its loss/recovery state. Returns the
    /// slow-start threshold the transport must adopt, if it must change.
    ///
    /// 当传输层切换丢包/恢复状态时调用。
    fn on_state_transition(&mut self, config: &Config, state: CaState) -> Option<u32>;

    /// Computes the slow-start threshold after a loss.
    fn query_loss_threshold(&mut self, config: &Config, current_window: u32) -> u32;

    /// Called when the transport finds a loss was spurious; returns the window
    /// to restore.
    fn undo_retreat(&mut self, current_window: u32, prior_window: u32) -> u32;

    /// Called on discrete congestion events.
    fn on_event(&mut self, config: &Config, event: CaEvent);

    /// Tears the session down and returns its final counters. Releasing an
    /// uninitialized or already released session returns zeros.
    ///
    /// 拆除会话并返回其最终计数。
    fn release(&mut self) -> ReleaseSummary;
}
