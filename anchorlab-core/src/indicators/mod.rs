//! Indicators: pure functions from bar history to a numeric series.
//!
//! Strategies compute these once in `bind` over the full history and index
//! into the result per bar. No value at bar t may depend on bars after t, so a
//! series computed on a prefix equals the prefix of the full-history series.

pub mod atr;
pub mod sma;

pub use atr::{true_range, Atr};
pub use sma::Sma;

use crate::domain::Bar;

/// An indicator produces one output per input bar.
///
/// Positions without a defined value (warmup, missing inputs) hold `f64::NAN`.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_20", "atr_14").
    fn name(&self) -> &str;

    /// Bars needed before the output is considered settled.
    fn lookback(&self) -> usize;

    /// Compute over the entire series. Output length equals `bars.len()`.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Synthetic bars from closes: daily spacing, high/low one point either side.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    use chrono::{Duration, TimeZone, Utc};
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            Bar::from_close(base + Duration::days(i as i64), close).with_range(close + 1.0, close - 1.0)
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
