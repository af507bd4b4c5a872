//! Full-history grid search: every candidate on every bar, ranked by score.
//!
//! Useful as the in-sample baseline a walk-forward report is compared against.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info_span};

use anchorlab_core::{run_backtest, Bar, EngineConfig, ParamSet, Series, StrategyFactory};

use crate::grid::ParamGrid;
use crate::metrics::{benchmark_window, Metric, ScoringInput, Stats};
use crate::selection::SelectionMetric;
use crate::walk_forward::WalkForwardError;

/// One ranked candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSearchRow {
    pub params: ParamSet,
    /// Selection score; `-inf` when missing or non-finite.
    pub score: f64,
    pub stats: Stats,
}

/// Backtest every candidate over `bars` and rank by `selection`, best first.
///
/// Ties keep grid order. Errors carry split index 0 since there is no split.
#[allow(clippy::too_many_arguments)]
pub fn grid_search(
    bars: &[Bar],
    factory: &dyn StrategyFactory,
    grid: &ParamGrid,
    metric: &dyn Metric,
    selection: &SelectionMetric,
    engine: &EngineConfig,
    parallel: bool,
    benchmark: Option<&Series>,
) -> Result<Vec<GridSearchRow>, WalkForwardError> {
    engine.validate()?;

    let span = info_span!("grid_search", bars = bars.len(), candidates = grid.len(), metric = %selection);
    let _guard = span.enter();

    let evaluate = |params: &ParamSet| -> Result<GridSearchRow, WalkForwardError> {
        let mut strategy = factory
            .build(params)
            .map_err(|source| WalkForwardError::Strategy {
                split: 0,
                params: params.to_string(),
                source,
            })?;
        let result = run_backtest(bars, strategy.as_mut(), engine)?;
        let window = benchmark.map(|b| benchmark_window(b, &result.equity_curve));
        let stats = metric.score(&ScoringInput {
            equity: &result.equity_curve,
            fills: &result.fills,
            trades: &result.trades,
            benchmark: window.as_ref(),
        });
        let score = selection.score(&stats);
        debug!(params = %params, score, "candidate scored");
        Ok(GridSearchRow {
            params: params.clone(),
            score,
            stats,
        })
    };

    let mut rows: Vec<GridSearchRow> = if parallel {
        grid.as_slice().par_iter().map(evaluate).collect::<Result<_, _>>()?
    } else {
        grid.iter().map(evaluate).collect::<Result<_, _>>()?
    };

    // Scores are finite or -inf, so total_cmp orders them as plain floats.
    rows.sort_by(|a, b| b.score.total_cmp(&a.score));
    Ok(rows)
}
