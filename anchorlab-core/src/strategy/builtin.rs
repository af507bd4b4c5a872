//! Reference strategies and the name → factory registry used by the CLI.

use super::{Strategy, StrategyError, StrategyFactory};
use crate::domain::{Bar, Timestamp};
use crate::execution::ExecutionSimulator;
use crate::indicators::{Indicator, Sma};
use crate::params::{ParamSet, ParamValue};

/// Names accepted by [`builtin_factory`].
pub const BUILTIN_STRATEGIES: &[&str] = &["flat", "sma_cross"];

// ─── Flat ────────────────────────────────────────────────────────────

/// Always signals 0. Equity stays at starting cash.
#[derive(Debug, Clone, Default)]
pub struct Flat;

impl Strategy for Flat {
    fn name(&self) -> &str {
        "flat"
    }

    fn on_bar(&mut self, _: Timestamp, _: &Bar, _: usize, _: &ExecutionSimulator) -> Option<f64> {
        Some(0.0)
    }
}

// ─── SMA crossover ───────────────────────────────────────────────────

/// Long (1) while SMA(fast) > SMA(slow), otherwise flat (0), or short (-1)
/// when `allow_short` is set. Intended for target sizing mode.
#[derive(Debug, Clone)]
pub struct SmaCross {
    fast: Sma,
    slow: Sma,
    allow_short: bool,
    fast_values: Vec<f64>,
    slow_values: Vec<f64>,
}

impl SmaCross {
    pub fn new(fast: usize, slow: usize, allow_short: bool) -> Self {
        Self {
            fast: Sma::new(fast),
            slow: Sma::new(slow),
            allow_short,
            fast_values: Vec::new(),
            slow_values: Vec::new(),
        }
    }

    pub fn from_params(params: &ParamSet) -> Result<Self, StrategyError> {
        let fast = period_param(params, "sma_cross", "fast", 10)?;
        let slow = period_param(params, "sma_cross", "slow", 30)?;
        let allow_short = match params.get("allow_short") {
            None | Some(ParamValue::Null) => false,
            Some(v) => v.as_bool().ok_or_else(|| StrategyError::InvalidParam {
                strategy: "sma_cross".into(),
                param: "allow_short".into(),
                reason: format!("expected a boolean, got {v}"),
            })?,
        };
        Ok(Self::new(fast, slow, allow_short))
    }
}

impl Strategy for SmaCross {
    fn name(&self) -> &str {
        "sma_cross"
    }

    fn bind(&mut self, bars: &[Bar]) {
        self.fast_values = self.fast.compute(bars);
        self.slow_values = self.slow.compute(bars);
    }

    fn warmup(&self) -> usize {
        self.fast.period().max(self.slow.period())
    }

    fn on_bar(&mut self, _: Timestamp, _: &Bar, index: usize, _: &ExecutionSimulator) -> Option<f64> {
        let fast = *self.fast_values.get(index)?;
        let slow = *self.slow_values.get(index)?;
        if fast > slow {
            Some(1.0)
        } else if self.allow_short && fast < slow {
            Some(-1.0)
        } else {
            Some(0.0)
        }
    }
}

/// A positive integer parameter, or `default` when absent.
fn period_param(
    params: &ParamSet,
    strategy: &str,
    name: &str,
    default: usize,
) -> Result<usize, StrategyError> {
    let Some(value) = params.get(name) else {
        return Ok(default);
    };
    match value.as_i64() {
        Some(v) if v >= 1 => Ok(v as usize),
        _ => Err(StrategyError::InvalidParam {
            strategy: strategy.into(),
            param: name.into(),
            reason: format!("expected a positive integer, got {value}"),
        }),
    }
}

// ─── Registry ────────────────────────────────────────────────────────

/// Look up a built-in strategy factory by name.
pub fn builtin_factory(name: &str) -> Result<Box<dyn StrategyFactory>, StrategyError> {
    match name {
        "flat" => Ok(Box::new(|_: &ParamSet| -> Result<Box<dyn Strategy>, StrategyError> {
            Ok(Box::new(Flat))
        })),
        "sma_cross" => Ok(Box::new(|p: &ParamSet| -> Result<Box<dyn Strategy>, StrategyError> {
            Ok(Box::new(SmaCross::from_params(p)?))
        })),
        other => Err(StrategyError::UnknownStrategy(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::SimulatorConfig;
    use crate::indicators::make_bars;

    #[test]
    fn sma_cross_signals_follow_averages() {
        let closes = [10.0, 10.0, 10.0, 11.0, 12.0, 13.0, 12.0, 10.0, 8.0, 7.0];
        let bars = make_bars(&closes);
        let mut s = SmaCross::new(2, 4, true);
        s.bind(&bars);
        let sim = ExecutionSimulator::new(SimulatorConfig::default());

        assert_eq!(s.warmup(), 4);
        // index 5: fast = 12.5, slow = 11.5
        assert_eq!(s.on_bar(bars[5].timestamp, &bars[5], 5, &sim), Some(1.0));
        // index 9: fast = 7.5, slow = 9.25
        assert_eq!(s.on_bar(bars[9].timestamp, &bars[9], 9, &sim), Some(-1.0));
    }

    #[test]
    fn long_only_cross_goes_flat() {
        let bars = make_bars(&[5.0, 4.0, 3.0, 2.0]);
        let mut s = SmaCross::new(1, 2, false);
        s.bind(&bars);
        let sim = ExecutionSimulator::new(SimulatorConfig::default());
        assert_eq!(s.on_bar(bars[3].timestamp, &bars[3], 3, &sim), Some(0.0));
    }

    #[test]
    fn factory_reads_params() {
        let factory = builtin_factory("sma_cross").unwrap();
        let params = ParamSet::new().with("fast", 3i64).with("slow", 8i64);
        let s = factory.build(&params).unwrap();
        assert_eq!(s.warmup(), 8);
    }

    #[test]
    fn factory_defaults_missing_params() {
        let s = builtin_factory("sma_cross").unwrap().build(&ParamSet::new()).unwrap();
        assert_eq!(s.warmup(), 30);
    }

    #[test]
    fn factory_rejects_non_positive_periods() {
        let factory = builtin_factory("sma_cross").unwrap();
        let err = factory
            .build(&ParamSet::new().with("fast", 0i64))
            .err()
            .unwrap();
        assert!(matches!(err, StrategyError::InvalidParam { ref param, .. } if param == "fast"));

        let err = factory
            .build(&ParamSet::new().with("slow", "long"))
            .err()
            .unwrap();
        assert!(matches!(err, StrategyError::InvalidParam { ref param, .. } if param == "slow"));
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        assert_eq!(
            builtin_factory("martingale").err(),
            Some(StrategyError::UnknownStrategy("martingale".into()))
        );
    }
}
