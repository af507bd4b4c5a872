//! Walk-forward optimization: select parameters in-sample, score them
//! strictly out-of-sample, advance, repeat.
//!
//! For each split produced by the [`WindowPolicy`]:
//! 1. Every grid candidate gets a fresh strategy and is backtested on the
//!    training bars only, then scored by the selection metric.
//! 2. The best finite score wins; ties keep the earliest candidate in grid order.
//! 3. The winner is re-run over training start → test end so its indicators
//!    see true history, and the result is sliced to the test dates for
//!    out-of-sample statistics.
//!
//! Candidates within a split are independent and may run on the rayon pool.
//! Results are collected in grid order before the arg-max, so parallel and
//! sequential runs pick identical parameters.

use std::ops::Range;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info_span};

use anchorlab_core::engine::validate_bars;
use anchorlab_core::{
    run_backtest, Bar, EngineConfig, EngineError, Fill, ParamSet, RunResult, Series,
    StrategyError, StrategyFactory, Timestamp, Trade,
};

use crate::grid::ParamGrid;
use crate::metrics::{benchmark_window, Metric, ScoringInput, Stats};
use crate::selection::SelectionMetric;
use crate::window::{SplitWindows, WindowPolicy};

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WalkForwardConfig {
    pub window: WindowPolicy,
    pub selection_metric: SelectionMetric,
    /// Evaluate candidates within a split on the rayon pool.
    pub parallel: bool,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            window: WindowPolicy::default(),
            selection_metric: SelectionMetric::default(),
            parallel: true,
        }
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum WalkForwardError {
    #[error("insufficient data: {total_bars} bars < minimum training window of {min_train_bars}")]
    InsufficientData {
        total_bars: usize,
        min_train_bars: usize,
    },
    #[error("invalid window: {0}")]
    InvalidWindow(String),
    #[error("no out-of-sample bars: {total_bars} bars leave nothing after the {min_train_bars}-bar training window")]
    EmptyOutOfSample {
        total_bars: usize,
        min_train_bars: usize,
    },
    #[error("failed to find a valid parameter set for split {split} using metric '{metric}'")]
    NoFiniteScore { split: usize, metric: String },
    #[error("backtest rejected: {0}")]
    Engine(#[from] EngineError),
    #[error("backtest error on split {split}: {source}")]
    Backtest {
        split: usize,
        #[source]
        source: EngineError,
    },
    #[error("cannot build strategy for split {split} with params [{params}]: {source}")]
    Strategy {
        split: usize,
        params: String,
        #[source]
        source: StrategyError,
    },
}

// ─── Result types ────────────────────────────────────────────────────

/// One split's immutable record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardSplit {
    /// 1-based split number.
    pub split: usize,
    pub train_bars: Range<usize>,
    pub test_bars: Range<usize>,
    pub train_start: Timestamp,
    /// Last training bar (inclusive).
    pub train_end: Timestamp,
    pub test_start: Timestamp,
    /// Last test bar (inclusive).
    pub test_end: Timestamp,
    pub params: ParamSet,
    pub selection_metric: String,
    /// Selection score of every candidate, in grid order.
    pub candidate_scores: Vec<f64>,
    pub in_sample_score: f64,
    pub in_sample_stats: Stats,
    /// Selection statistic out-of-sample; `NaN` when missing.
    pub oos_score: f64,
    pub oos_stats: Stats,
    /// Equity of the winner's evaluation run (training start → test end).
    pub equity_curve: Series,
    /// `equity_curve` restricted to the test dates.
    pub oos_equity: Series,
    pub oos_fills: Vec<Fill>,
    pub oos_trades: Vec<Trade>,
}

/// How the degradation ratio was computed (or why it wasn't).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DegradationFlag {
    /// IS score >= 0.1, ratio computed normally.
    Normal,
    /// IS score < 0.1, using difference (OOS - IS) instead.
    LowIsScore,
    /// IS score is negative, ratio skipped entirely.
    NegativeIsScore,
    /// IS score positive (>= 0.1) but OOS score negative: clamped to 0.0.
    FailedOos,
    /// No finite score on one side to compare.
    InsufficientData,
}

/// Complete result of a walk-forward run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardReport {
    /// Fingerprint of the run configuration, when run from a config file.
    pub fingerprint: Option<String>,
    pub selection_metric: String,
    pub splits: Vec<WalkForwardSplit>,
    pub mean_is_score: f64,
    pub mean_oos_score: f64,
    /// Mean OOS / mean IS. `None` when not meaningful (see `degradation_flag`).
    pub degradation_ratio: Option<f64>,
    pub degradation_flag: DegradationFlag,
    /// Every split's OOS equity, concatenated in order.
    pub oos_equity: Series,
}

impl WalkForwardReport {
    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }
}

// ─── Orchestration ───────────────────────────────────────────────────

/// Shared read-only inputs for one optimization run.
struct Context<'a> {
    bars: &'a [Bar],
    factory: &'a dyn StrategyFactory,
    metric: &'a dyn Metric,
    engine: &'a EngineConfig,
    benchmark: Option<&'a Series>,
}

impl Context<'_> {
    fn run(&self, split: usize, params: &ParamSet, range: Range<usize>) -> Result<RunResult, WalkForwardError> {
        let mut strategy = self
            .factory
            .build(params)
            .map_err(|source| WalkForwardError::Strategy {
                split,
                params: params.to_string(),
                source,
            })?;
        run_backtest(&self.bars[range], strategy.as_mut(), self.engine)
            .map_err(|source| WalkForwardError::Backtest { split, source })
    }

    /// Score a run against the benchmark restricted to the run's own dates.
    fn score(&self, result: &RunResult) -> Stats {
        let benchmark = self
            .benchmark
            .map(|b| benchmark_window(b, &result.equity_curve));
        self.metric.score(&ScoringInput {
            equity: &result.equity_curve,
            fills: &result.fills,
            trades: &result.trades,
            benchmark: benchmark.as_ref(),
        })
    }
}

/// Run walk-forward optimization over `bars`.
///
/// Fails before any backtest if the engine config or the bars are invalid,
/// the window policy is invalid, or the history cannot produce a single
/// split. Fails a split (and the run) when no candidate scores finitely.
#[allow(clippy::too_many_arguments)]
pub fn run_walk_forward(
    bars: &[Bar],
    factory: &dyn StrategyFactory,
    grid: &ParamGrid,
    metric: &dyn Metric,
    engine: &EngineConfig,
    config: &WalkForwardConfig,
    benchmark: Option<&Series>,
) -> Result<WalkForwardReport, WalkForwardError> {
    engine.validate()?;
    validate_bars(bars)?;

    let timestamps: Vec<Timestamp> = bars.iter().map(|b| b.timestamp).collect();
    let schedule = config.window.schedule(&timestamps)?;
    let selection = &config.selection_metric;

    let span = info_span!(
        "walk_forward",
        bars = bars.len(),
        splits = schedule.len(),
        candidates = grid.len(),
        metric = %selection,
    );
    let _guard = span.enter();

    let ctx = Context {
        bars,
        factory,
        metric,
        engine,
        benchmark,
    };

    let mut splits = Vec::with_capacity(schedule.len());
    for (i, windows) in schedule.into_iter().enumerate() {
        let split = evaluate_split(&ctx, i + 1, windows, grid, selection, config.parallel)?;
        splits.push(split);
    }

    Ok(aggregate(splits, selection))
}

fn evaluate_split(
    ctx: &Context<'_>,
    split: usize,
    windows: SplitWindows,
    grid: &ParamGrid,
    selection: &SelectionMetric,
    parallel: bool,
) -> Result<WalkForwardSplit, WalkForwardError> {
    let evaluate = |params: &ParamSet| -> Result<(f64, Stats), WalkForwardError> {
        let result = ctx.run(split, params, windows.train.clone())?;
        let stats = ctx.score(&result);
        Ok((selection.score(&stats), stats))
    };

    let scored: Vec<(f64, Stats)> = if parallel {
        grid.as_slice().par_iter().map(evaluate).collect::<Result<_, _>>()?
    } else {
        grid.iter().map(evaluate).collect::<Result<_, _>>()?
    };

    let candidate_scores: Vec<f64> = scored.iter().map(|(s, _)| *s).collect();
    let best = SelectionMetric::select(&candidate_scores).ok_or_else(|| {
        WalkForwardError::NoFiniteScore {
            split,
            metric: selection.key().to_string(),
        }
    })?;
    let params = grid.as_slice()[best].clone();
    let (in_sample_score, in_sample_stats) = scored.into_iter().nth(best).ok_or_else(|| {
        WalkForwardError::NoFiniteScore {
            split,
            metric: selection.key().to_string(),
        }
    })?;

    let eval_range = windows.evaluation();
    let full = ctx.run(split, &params, eval_range.clone())?;

    let bars = ctx.bars;
    let test_start = bars[windows.test.start].timestamp;
    let test_end = bars[windows.test.end - 1].timestamp;
    let oos = full.slice_between(test_start, test_end);
    let oos_stats = ctx.score(&oos);
    let oos_score = Some(selection.score(&oos_stats))
        .filter(|v| v.is_finite())
        .unwrap_or(f64::NAN);

    debug!(
        split,
        train = ?windows.train,
        test = ?windows.test,
        params = %params,
        in_sample_score,
        oos_score,
        "split selected"
    );

    Ok(WalkForwardSplit {
        split,
        train_start: bars[windows.train.start].timestamp,
        train_end: bars[windows.train.end - 1].timestamp,
        test_start,
        test_end,
        train_bars: windows.train,
        test_bars: windows.test,
        params,
        selection_metric: selection.key().to_string(),
        candidate_scores,
        in_sample_score,
        in_sample_stats,
        oos_score,
        oos_stats,
        equity_curve: full.equity_curve,
        oos_equity: oos.equity_curve,
        oos_fills: oos.fills,
        oos_trades: oos.trades,
    })
}

fn aggregate(splits: Vec<WalkForwardSplit>, selection: &SelectionMetric) -> WalkForwardReport {
    let mean_is_score = finite_mean(splits.iter().map(|s| s.in_sample_score));
    let mean_oos_score = finite_mean(splits.iter().map(|s| s.oos_score));
    let (degradation_ratio, degradation_flag) =
        compute_degradation_ratio(mean_is_score, mean_oos_score);

    let mut oos_equity = Series::new();
    for s in &splits {
        oos_equity.extend(&s.oos_equity);
    }

    WalkForwardReport {
        fingerprint: None,
        selection_metric: selection.key().to_string(),
        splits,
        mean_is_score,
        mean_oos_score,
        degradation_ratio,
        degradation_flag,
        oos_equity,
    }
}

fn finite_mean(values: impl Iterator<Item = f64>) -> f64 {
    let finite: Vec<f64> = values.filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        f64::NAN
    } else {
        finite.iter().sum::<f64>() / finite.len() as f64
    }
}

/// Compute degradation ratio with edge case handling.
///
/// - IS >= 0.1: ratio = OOS / IS (Normal)
/// - IS < 0.1 and >= 0: difference = OOS - IS (LowIsScore)
/// - IS < 0: ratio skipped (NegativeIsScore)
/// - IS >= 0.1 but OOS < 0: clamped to 0.0 (FailedOos)
pub fn compute_degradation_ratio(mean_is: f64, mean_oos: f64) -> (Option<f64>, DegradationFlag) {
    if mean_is.is_nan() || mean_oos.is_nan() {
        (None, DegradationFlag::InsufficientData)
    } else if mean_is < 0.0 {
        (None, DegradationFlag::NegativeIsScore)
    } else if mean_is < 0.1 {
        (Some(mean_oos - mean_is), DegradationFlag::LowIsScore)
    } else if mean_oos < 0.0 {
        // Positive IS but negative OOS: canonical overfit signature
        (Some(0.0), DegradationFlag::FailedOos)
    } else {
        (Some(mean_oos / mean_is), DegradationFlag::Normal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degradation_normal() {
        let (ratio, flag) = compute_degradation_ratio(1.0, 0.5);
        assert_eq!(flag, DegradationFlag::Normal);
        assert!((ratio.unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn degradation_low_is_uses_difference() {
        let (ratio, flag) = compute_degradation_ratio(0.05, 0.2);
        assert_eq!(flag, DegradationFlag::LowIsScore);
        assert!((ratio.unwrap() - 0.15).abs() < 1e-12);
    }

    #[test]
    fn degradation_negative_is_skipped() {
        assert_eq!(
            compute_degradation_ratio(-0.3, 0.4),
            (None, DegradationFlag::NegativeIsScore)
        );
    }

    #[test]
    fn degradation_failed_oos_clamped() {
        assert_eq!(
            compute_degradation_ratio(1.2, -0.4),
            (Some(0.0), DegradationFlag::FailedOos)
        );
    }

    #[test]
    fn degradation_undefined_without_scores() {
        assert_eq!(
            compute_degradation_ratio(f64::NAN, 0.4),
            (None, DegradationFlag::InsufficientData)
        );
    }

    #[test]
    fn finite_mean_ignores_undefined() {
        assert_eq!(finite_mean([1.0, f64::NAN, 3.0].into_iter()), 2.0);
        assert!(finite_mean([f64::NAN].into_iter()).is_nan());
    }

    #[test]
    fn error_names_the_metric() {
        let e = WalkForwardError::NoFiniteScore {
            split: 3,
            metric: "Calmar".into(),
        };
        assert_eq!(
            e.to_string(),
            "failed to find a valid parameter set for split 3 using metric 'Calmar'"
        );
    }
}
