//! Selection metric: which named statistic ranks candidate parameter sets.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::metrics::Stats;

/// Default selection key.
pub const SHARPE_ANNUALIZED: &str = "Sharpe_annualized";
/// Per-period Sharpe, used when the annualized form is absent.
pub const SHARPE_DAILY: &str = "Sharpe_d";

/// Names the statistic used to rank candidates. Higher is better.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionMetric(String);

impl Default for SelectionMetric {
    fn default() -> Self {
        Self(SHARPE_ANNUALIZED.to_string())
    }
}

impl SelectionMetric {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn key(&self) -> &str {
        &self.0
    }

    /// The candidate's score. Missing or `NaN` values rank as `-inf`; an
    /// infinite statistic is passed through unchanged.
    pub fn score(&self, stats: &Stats) -> f64 {
        let value = stats.get(&self.0).or_else(|| {
            (self.0 == SHARPE_ANNUALIZED)
                .then(|| stats.get(SHARPE_DAILY))
                .flatten()
        });
        match value {
            Some(v) if !v.is_nan() => *v,
            _ => f64::NEG_INFINITY,
        }
    }

    /// Index of the best score; ties keep the first. `NaN` entries are skipped.
    ///
    /// `None` when the best score is not finite: every candidate ranked
    /// `-inf`, or the winner scored `+inf`, which cannot be compared.
    pub fn select(scores: &[f64]) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &s) in scores.iter().enumerate() {
            if s.is_nan() {
                continue;
            }
            match best {
                Some((_, b)) if s <= b => {}
                _ => best = Some((i, s)),
            }
        }
        best.filter(|(_, s)| s.is_finite()).map(|(i, _)| i)
    }
}

impl fmt::Display for SelectionMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
