//! Anchorlab Core — domain types, execution simulator, strategy contract, bar loop.
//!
//! This crate contains the deterministic heart of a backtest:
//! - Domain types (bars, fills, trades, time series)
//! - Execution simulator with cost-basis accounting across partial closes and reversals
//! - Strategy capability contract with optional risk and trade-closed hooks
//! - Indicators (SMA, ATR)
//! - Backtest engine with notional / ATR-risk / fixed sizing

pub mod domain;
pub mod engine;
pub mod execution;
pub mod indicators;
pub mod params;
pub mod strategy;

pub use domain::{Bar, Direction, Fill, Series, Timestamp, Trade, TradeId};
pub use engine::{run_backtest, EngineConfig, EngineError, RunResult, SizingMode};
pub use execution::{ExecutionSimulator, SimulatorConfig};
pub use params::{ParamSet, ParamValue};
pub use strategy::{
    builtin_factory, DynamicRisk, HookError, Strategy, StrategyError, StrategyFactory,
    TradeObserver,
};
