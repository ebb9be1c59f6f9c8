//! Operator-facing named tunables.
//! 面向运维的具名可调参数。

use super::{Config, GAIN_UNIT};
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// One operator-adjustable parameter of the [`Config`] snapshot.
///
/// [`Config`] 快照中一个可由运维调整的参数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tunable {
    RateCeiling,
    GainCeiling,
    InitialGain,
    MinWindow,
    MaxWindow,
    Adaptive,
    Turbo,
    Verbosity,
}

impl Tunable {
    pub const ALL: [Tunable; 8] = [
        Tunable::RateCeiling,
        Tunable::GainCeiling,
        Tunable::InitialGain,
        Tunable::MinWindow,
        Tunable::MaxWindow,
        Tunable::Adaptive,
        Tunable::Turbo,
        Tunable::Verbosity,
    ];

    /// The name operators address this tunable by.
    pub fn name(self) -> &'static str {
        match self {
            Tunable::RateCeiling => "rate_ceiling",
            Tunable::GainCeiling => "gain_ceiling",
            Tunable::InitialGain => "initial_gain",
            Tunable::MinWindow => "min_window",
            Tunable::MaxWindow => "max_window",
            Tunable::Adaptive => "adaptive",
            Tunable::Turbo => "turbo",
            Tunable::Verbosity => "verbosity",
        }
    }

    /// One-line help text for operator interfaces.
    pub fn description(self) -> &'static str {
        match self {
            Tunable::RateCeiling => "Target rate ceiling in bytes/sec (default 10Gbps)",
            Tunable::GainCeiling => "Gain ceiling, fixed-point x10 (30 = 3.0x)",
            Tunable::InitialGain => "Gain new sessions start at, x10 (default: the gain ceiling)",
            Tunable::MinWindow => "Minimum congestion window in segments",
            Tunable::MaxWindow => "Maximum congestion window in segments",
            Tunable::Adaptive => "Enable adaptive rate control",
            Tunable::Turbo => "Turbo mode, ignore all congestion signals",
            Tunable::Verbosity => "Log verbosity: 0 quiet, 1 lifecycle, 2 periodic diagnostics",
        }
    }

    /// Parses `value` and writes it into `config`. The caller validates the
    /// resulting snapshot as a whole.
    ///
    /// 解析 `value` 并写入 `config`。调用方负责整体校验结果快照。
    pub fn apply(self, config: &mut Config, value: &str) -> Result<()> {
        let cc = &mut config.congestion_control;
        let value = value.trim();
        match self {
            Tunable::RateCeiling => cc.rate_ceiling = self.parse_number(value)?,
            Tunable::GainCeiling => cc.gain_ceiling = self.parse_number(value)?,
            Tunable::InitialGain => {
                cc.initial_gain = if value.eq_ignore_ascii_case("default") {
                    None
                } else {
                    Some(self.parse_number(value)?)
                };
            }
            Tunable::MinWindow => cc.min_window = self.parse_number(value)?,
            Tunable::MaxWindow => cc.max_window = self.parse_number(value)?,
            Tunable::Adaptive => cc.adaptive_enabled = self.parse_flag(value)?,
            Tunable::Turbo => cc.turbo_enabled = self.parse_flag(value)?,
            Tunable::Verbosity => config.verbosity = self.parse_number(value)?,
        }
        Ok(())
    }

    /// Renders the tunable's current value. Gains are shown fractionally.
    ///
    /// 渲染参数当前值。增益以小数形式显示。
    pub fn render(self, config: &Config) -> String {
        let cc = &config.congestion_control;
        match self {
            Tunable::RateCeiling => cc.rate_ceiling.to_string(),
            Tunable::GainCeiling => format_gain(cc.gain_ceiling),
            Tunable::InitialGain => match cc.initial_gain {
                Some(gain) => format_gain(gain),
                None => "default".to_string(),
            },
            Tunable::MinWindow => cc.min_window.to_string(),
            Tunable::MaxWindow => cc.max_window.to_string(),
            Tunable::Adaptive => cc.adaptive_enabled.to_string(),
            Tunable::Turbo => cc.turbo_enabled.to_string(),
            Tunable::Verbosity => config.verbosity.to_string(),
        }
    }

    fn parse_number<T: FromStr>(self, value: &str) -> Result<T> {
        value.parse().map_err(|_| self.invalid(value))
    }

    fn parse_flag(self, value: &str) -> Result<bool> {
        match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "on" | "y" | "yes" => Ok(true),
            "0" | "false" | "off" | "n" | "no" => Ok(false),
            _ => Err(self.invalid(value)),
        }
    }

    fn invalid(self, value: &str) -> Error {
        Error::InvalidTunableValue {
            name: self.name(),
            value: value.to_string(),
        }
    }
}

impl FromStr for Tunable {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Tunable::ALL
            .into_iter()
            .find(|tunable| tunable.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::UnknownTunable(wanted.to_string()))
    }
}

impl fmt::Display for Tunable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Formats a fixed-point x10 gain, truncating: `15` renders as `1.5x`.
pub fn format_gain(gain: u32) -> String {
    format!("{}.{}x", gain / GAIN_UNIT, gain % GAIN_UNIT)
}
