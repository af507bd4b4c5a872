//! Engine configuration and the errors that reject a run before any bar.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Timestamp};
use crate::execution::SimulatorConfig;

// ─── Errors ──────────────────────────────────────────────────────────

/// Reasons a backtest is rejected. Always raised before the first bar.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("unsupported sizing mode '{0}' (expected \"delta\" or \"target\")")]
    UnsupportedMode(String),
    #[error("bar {index} ({timestamp}) has no usable close price")]
    MissingClose { index: usize, timestamp: Timestamp },
    #[error("bar {index} ({timestamp}) is not after the previous bar")]
    UnorderedTimestamps { index: usize, timestamp: Timestamp },
    #[error("{name} length must be positive, got {length}")]
    InvalidIndicatorLength { name: &'static str, length: usize },
    #[error("invalid engine setting '{field}': {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}

// ─── Sizing mode ─────────────────────────────────────────────────────

/// How the engine interprets a strategy's signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SizingMode {
    /// Signal × size is an incremental order.
    Delta,
    /// Signal × size is the absolute target position.
    #[default]
    Target,
}

impl SizingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delta => "delta",
            Self::Target => "target",
        }
    }
}

impl fmt::Display for SizingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SizingMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delta" => Ok(Self::Delta),
            "target" => Ok(Self::Target),
            other => Err(EngineError::UnsupportedMode(other.to_string())),
        }
    }
}

impl TryFrom<String> for SizingMode {
    type Error = EngineError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SizingMode> for String {
    fn from(mode: SizingMode) -> Self {
        mode.as_str().to_string()
    }
}

// ─── Engine config ───────────────────────────────────────────────────

/// Knobs for one backtest run.
///
/// Sizing resolves per bar in priority order: `notional` if set, then
/// risk-based when `risk_multiplier` is set and ATR is available, then the
/// fixed `size`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub starting_cash: f64,
    pub mode: SizingMode,
    /// Fixed unit count per unit of signal.
    pub size: u64,
    /// Target notional per unit of signal; size = floor(notional / price).
    pub notional: Option<f64>,
    /// ATR multiple defining the per-unit risk distance.
    pub risk_multiplier: Option<f64>,
    /// ATR length. Also extends warmup to at least this many bars.
    pub atr_len: Option<usize>,
    /// Fraction of equity risked per unit of signal (0.01 = 1%).
    pub risk_fraction: f64,
    pub commission: f64,
    pub slippage_bps: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            starting_cash: 100_000.0,
            mode: SizingMode::Target,
            size: 1,
            notional: None,
            risk_multiplier: None,
            atr_len: None,
            risk_fraction: 0.01,
            commission: 0.0,
            slippage_bps: 0.0,
        }
    }
}

impl EngineConfig {
    pub fn new(starting_cash: f64, mode: SizingMode) -> Self {
        Self {
            starting_cash,
            mode,
            ..Self::default()
        }
    }

    pub fn simulator(&self) -> SimulatorConfig {
        SimulatorConfig {
            starting_cash: self.starting_cash,
            commission: self.commission,
            slippage_bps: self.slippage_bps,
        }
    }

    /// Reject settings that would make the run meaningless.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.atr_len == Some(0) {
            return Err(EngineError::InvalidIndicatorLength {
                name: "atr",
                length: 0,
            });
        }
        if self.size == 0 {
            return Err(invalid("size", "must be at least 1"));
        }
        finite("starting_cash", self.starting_cash)?;
        finite("risk_fraction", self.risk_fraction)?;
        finite("commission", self.commission)?;
        finite("slippage_bps", self.slippage_bps)?;
        if self.risk_fraction < 0.0 {
            return Err(invalid("risk_fraction", "must not be negative"));
        }
        if self.commission < 0.0 {
            return Err(invalid("commission", "must not be negative"));
        }
        if self.slippage_bps < 0.0 {
            return Err(invalid("slippage_bps", "must not be negative"));
        }
        for (field, value) in [("notional", self.notional), ("risk_multiplier", self.risk_multiplier)] {
            if let Some(v) = value {
                if !(v.is_finite() && v > 0.0) {
                    return Err(invalid(field, &format!("must be positive, got {v}")));
                }
            }
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> EngineError {
    EngineError::InvalidConfig {
        field,
        reason: reason.to_string(),
    }
}

fn finite(field: &'static str, value: f64) -> Result<(), EngineError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(invalid(field, &format!("must be finite, got {value}")))
    }
}

/// Every bar needs a finite close and a timestamp after its predecessor.
pub fn validate_bars(bars: &[Bar]) -> Result<(), EngineError> {
    for (index, bar) in bars.iter().enumerate() {
        if !bar.has_close() {
            return Err(EngineError::MissingClose {
                index,
                timestamp: bar.timestamp,
            });
        }
        if index > 0 && bar.timestamp <= bars[index - 1].timestamp {
            return Err(EngineError::UnorderedTimestamps {
                index,
                timestamp: bar.timestamp,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn mode_parses_known_strings() {
        assert_eq!("delta".parse::<SizingMode>().unwrap(), SizingMode::Delta);
        assert_eq!("target".parse::<SizingMode>().unwrap(), SizingMode::Target);
        assert_eq!(
            "percent".parse::<SizingMode>(),
            Err(EngineError::UnsupportedMode("percent".into()))
        );
    }

    #[test]
    fn mode_serde_uses_lowercase_strings() {
        let json = serde_json::to_string(&SizingMode::Delta).unwrap();
        assert_eq!(json, "\"delta\"");
        let err = serde_json::from_str::<SizingMode>("\"sideways\"").unwrap_err();
        assert!(err.to_string().contains("unsupported sizing mode"));
    }

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_atr_length_rejected() {
        let config = EngineConfig {
            atr_len: Some(0),
            ..EngineConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(EngineError::InvalidIndicatorLength { name: "atr", length: 0 })
        );
    }

    #[test]
    fn non_positive_notional_rejected() {
        let config = EngineConfig {
            notional: Some(0.0),
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfig { field: "notional", .. })
        ));
    }

    #[test]
    fn bars_must_be_strictly_increasing() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bars = vec![
            Bar::from_close(t0, 1.0),
            Bar::from_close(t0 + Duration::days(1), 1.0),
            Bar::from_close(t0 + Duration::days(1), 1.0),
        ];
        assert!(matches!(
            validate_bars(&bars),
            Err(EngineError::UnorderedTimestamps { index: 2, .. })
        ));
    }

    #[test]
    fn nan_close_rejected() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bars = vec![Bar::from_close(t0, f64::NAN)];
        assert!(matches!(
            validate_bars(&bars),
            Err(EngineError::MissingClose { index: 0, .. })
        ));
    }
}
