//! 定义了拥塞控制引擎的可配置参数。
//! Defines configurable parameters for the congestion-control engine.

use crate::error::{Error, Result};
use std::time::Duration;

pub mod store;
pub mod tunable;

pub use store::ConfigStore;
pub use tunable::Tunable;

/// Fixed-point unit for gains: a gain of `GAIN_UNIT` is 1.0x.
///
/// 增益的定点单位：`GAIN_UNIT` 表示 1.0 倍。
pub const GAIN_UNIT: u32 = 10;

/// A snapshot of every tunable the engine reads while making a decision.
///
/// 做出决策时引擎读取的所有可调参数的快照。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Congestion control-related parameters.
    /// 拥塞控制相关参数。
    pub congestion_control: CongestionControlConfig,

    /// Registration and drain parameters.
    /// 注册与排空相关参数。
    pub lifecycle: LifecycleConfig,

    /// Diagnostic verbosity. 0 is quiet, 1 logs lifecycle changes, 2 adds the
    /// periodic per-decision diagnostic.
    /// 诊断输出级别。
    pub verbosity: u8,
}

/// Congestion control-related parameters.
///
/// 拥塞控制相关参数。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CongestionControlConfig {
    /// Upper bound of the target rate, in bytes per second.
    /// 目标速率上限（字节/秒）。
    pub rate_ceiling: u64,
    /// Upper bound of the window gain, fixed-point x10 (30 = 3.0x).
    /// 窗口增益上限，定点 x10（30 = 3.0 倍）。
    pub gain_ceiling: u32,
    /// Gain a new session starts at. `None` starts at `gain_ceiling`.
    /// 新会话的初始增益。`None` 表示从 `gain_ceiling` 开始。
    pub initial_gain: Option<u32>,
    /// The minimum congestion window, in segments.
    /// 最小拥塞窗口（以报文段为单位）。
    pub min_window: u32,
    /// The maximum congestion window, in segments.
    /// 最大拥塞窗口（以报文段为单位）。
    pub max_window: u32,
    /// When false, target rate and gain are pinned to their ceilings.
    /// 为 false 时，目标速率和增益固定为上限值。
    pub adaptive_enabled: bool,
    /// When true, every loss and RTT based retreat signal is ignored.
    /// 为 true 时，忽略所有基于丢包和 RTT 的退让信号。
    pub turbo_enabled: bool,
}

/// Registration and drain parameters.
///
/// 注册与排空相关参数。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// How many times deregistration polls for active sessions to drain.
    /// 注销时轮询活跃会话排空的次数。
    pub drain_poll_attempts: u32,
    /// The fixed wait between two drain polls.
    /// 两次排空轮询之间的固定等待时间。
    pub drain_poll_interval: Duration,
}

impl Config {
    /// Checks the invariants every published snapshot must hold.
    ///
    /// 检查每个发布的快照都必须满足的不变量。
    pub fn validate(&self) -> Result<()> {
        let cc = &self.congestion_control;
        if cc.rate_ceiling == 0 {
            return Err(Error::InvalidConfig("rate_ceiling must be greater than zero"));
        }
        if cc.gain_ceiling < GAIN_UNIT {
            return Err(Error::InvalidConfig("gain_ceiling must be at least 1.0x"));
        }
        if cc.min_window == 0 {
            return Err(Error::InvalidConfig("min_window must be greater than zero"));
        }
        if cc.min_window > cc.max_window {
            return Err(Error::InvalidConfig("min_window must not exceed max_window"));
        }
        if let Some(gain) = cc.initial_gain {
            if !(GAIN_UNIT..=cc.gain_ceiling).contains(&gain) {
                return Err(Error::InvalidConfig(
                    "initial_gain must lie between 1.0x and gain_ceiling",
                ));
            }
        }
        Ok(())
    }
}

impl CongestionControlConfig {
    /// The gain a fresh session is seeded with.
    pub fn starting_gain(&self) -> u32 {
        self.initial_gain.unwrap_or(self.gain_ceiling)
    }

    /// Lowest target rate the adaptation may settle at (`rate_ceiling / 20`).
    pub fn rate_floor(&self) -> u64 {
        self.rate_ceiling / 20
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            congestion_control: CongestionControlConfig::default(),
            lifecycle: LifecycleConfig::default(),
            verbosity: 1,
        }
    }
}

impl Default for CongestionControlConfig {
    fn default() -> Self {
        Self {
            rate_ceiling: 1_250_000_000, // 10 Gbit/s
            gain_ceiling: 30,            // 3.0x
            initial_gain: None,
            min_window: 50,
            max_window: 10_000,
            adaptive_enabled: true,
            turbo_enabled: false,
        }
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            drain_poll_attempts: 10,
            drain_poll_interval: Duration::from_millis(100),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.congestion_control.starting_gain(), 30);
        assert_eq!(config.congestion_control.rate_floor(), 62_500_000);
    }

    #[test]
    fn test_validate_rejects_broken_invariants() {
        let mut config = Config::default();
        config.congestion_control.rate_ceiling = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = Config::default();
        config.congestion_control.min_window = 20_000;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = Config::default();
        config.congestion_control.gain_ceiling = 9;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = Config::default();
        config.congestion_control.initial_gain = Some(31);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_initial_gain_overrides_ceiling() {
        let mut config = Config::default();
        config.congestion_control.initial_gain = Some(15);
        assert!(config.validate().is_ok());
        assert_eq!(config.congestion_control.starting_gain(), 15);
    }
}
