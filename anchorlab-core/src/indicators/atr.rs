//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|), with
//! TR[0] = high-low. Smoothed recursively with alpha = 1/period, seeded from
//! the first defined TR value (no averaging window), so ATR is defined from
//! the first bar that has a high/low range.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }
}

/// True Range series. NaN wherever high or low is missing.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let (Some(h), Some(l)) = (bar.high, bar.low) else {
                return f64::NAN;
            };
            match i.checked_sub(1).map(|p| bars[p].close) {
                Some(pc) => (h - l).max((h - pc).abs()).max((l - pc).abs()),
                None => h - l,
            }
        })
        .collect()
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    /// ATR is defined early but only settles after `period` bars.
    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let alpha = 1.0 / self.period as f64;
        let mut prev: Option<f64> = None;
        true_range(bars)
            .into_iter()
            .map(|tr| {
                if tr.is_nan() {
                    return f64::NAN;
                }
                let next = match prev {
                    Some(p) => alpha * tr + (1.0 - alpha) * p,
                    None => tr,
                };
                prev = Some(next);
                next
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};
    use chrono::{Duration, TimeZone, Utc};

    fn make_ohlc_bars(data: &[(f64, f64, f64)]) -> Vec<Bar> {
        let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        data.iter()
            .enumerate()
            .map(|(i, &(high, low, close))| {
                Bar::from_close(base + Duration::days(i as i64), close).with_range(high, low)
            })
            .collect()
    }

    #[test]
    fn true_range_basic() {
        let bars = make_ohlc_bars(&[
            (105.0, 95.0, 102.0),  // TR = 10
            (108.0, 100.0, 106.0), // TR = max(8, 6, 2) = 8
            (107.0, 98.0, 99.0),   // TR = max(9, 1, 8) = 9
        ]);
        let tr = true_range(&bars);
        assert_approx(tr[0], 10.0, DEFAULT_EPSILON);
        assert_approx(tr[1], 8.0, DEFAULT_EPSILON);
        assert_approx(tr[2], 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        let bars = make_ohlc_bars(&[(102.0, 97.0, 100.0), (115.0, 108.0, 112.0)]);
        assert_approx(true_range(&bars)[1], 15.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_recursive_from_first_range() {
        let bars = make_ohlc_bars(&[
            (105.0, 95.0, 102.0),  // TR = 10
            (108.0, 100.0, 106.0), // TR = 8
            (107.0, 98.0, 99.0),   // TR = 9
        ]);
        let result = Atr::new(2).compute(&bars);
        assert_approx(result[0], 10.0, DEFAULT_EPSILON);
        assert_approx(result[1], 9.0, DEFAULT_EPSILON);
        assert_approx(result[2], 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_skips_missing_ranges() {
        let mut bars = make_ohlc_bars(&[
            (105.0, 95.0, 102.0),
            (108.0, 100.0, 106.0),
            (107.0, 98.0, 99.0),
        ]);
        bars[1].high = None;
        let result = Atr::new(2).compute(&bars);
        assert_approx(result[0], 10.0, DEFAULT_EPSILON);
        assert!(result[1].is_nan());
        // Carries the last defined value through the gap.
        assert_approx(result[2], 0.5 * 9.0 + 0.5 * 10.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_close_only_is_undefined() {
        let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let bars = vec![Bar::from_close(base, 10.0), Bar::from_close(base + Duration::days(1), 11.0)];
        assert!(Atr::new(3).compute(&bars).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn atr_lookback() {
        assert_eq!(Atr::new(14).lookback(), 14);
    }
}
