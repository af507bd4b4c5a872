//! Anchorlab Runner — scoring, parameter grids, walk-forward optimization.
//!
//! This crate builds on `anchorlab-core` to provide:
//! - Performance statistics over an equity curve (`summarize`)
//! - Selection metric and deterministic arg-max
//! - Parameter grids (cartesian product, token parsing, TOML tables)
//! - Anchored and rolling window policies
//! - Walk-forward optimizer with out-of-sample scoring
//! - Full-history grid search
//! - TOML run configuration with content fingerprint

pub mod config;
pub mod grid;
pub mod grid_search;
pub mod metrics;
pub mod selection;
pub mod walk_forward;
pub mod window;

pub use config::{ConfigError, RunConfig, StrategyConfig};
pub use grid::{GridError, ParamGrid};
pub use grid_search::{grid_search, GridSearchRow};
pub use metrics::{benchmark_window, summarize, DefaultMetrics, Metric, ScoringInput, Stats};
pub use selection::SelectionMetric;
pub use walk_forward::{
    compute_degradation_ratio, run_walk_forward, DegradationFlag, WalkForwardConfig,
    WalkForwardError, WalkForwardReport, WalkForwardSplit,
};
pub use window::{SplitWindows, WindowPolicy};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn reports_are_send_sync() {
        assert_send::<WalkForwardReport>();
        assert_sync::<WalkForwardReport>();
        assert_send::<WalkForwardSplit>();
        assert_sync::<WalkForwardSplit>();
        assert_send::<GridSearchRow>();
        assert_sync::<GridSearchRow>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<RunConfig>();
        assert_sync::<RunConfig>();
        assert_send::<WalkForwardConfig>();
        assert_sync::<WalkForwardConfig>();
        assert_send::<ParamGrid>();
        assert_sync::<ParamGrid>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<WalkForwardError>();
        assert_sync::<WalkForwardError>();
        assert_send::<ConfigError>();
        assert_sync::<ConfigError>();
    }

    #[test]
    fn default_metrics_is_a_shareable_metric() {
        fn assert_metric<M: Metric>() {}
        assert_metric::<DefaultMetrics>();
    }
}
