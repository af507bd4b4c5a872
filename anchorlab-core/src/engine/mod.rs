//! Backtest engine: drives a strategy bar by bar against an execution simulator.

pub mod backtest;
pub mod config;
pub mod sizing;
pub mod state;

pub use backtest::run_backtest;
pub use config::{validate_bars, EngineConfig, EngineError, SizingMode};
pub use sizing::{resolve_base_size, signal_units};
pub use state::RunResult;
