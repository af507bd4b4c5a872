//! Strategy capability contract.
//!
//! A strategy is a stateful signal source driven bar by bar by the engine.
//! The required surface is `on_bar`; `bind` and `warmup` have defaults. Two
//! optional capabilities are exposed through accessor methods that the engine
//! queries once at setup:
//!
//! - [`DynamicRisk`]: per-bar override of the static risk fraction
//! - [`TradeObserver`]: notified with realized PnL whenever a trade finalizes
//!
//! Hook failures are reported as [`HookError`]. The engine logs and ignores
//! that one error kind; it never aborts the bar loop. Panics are not caught.

pub mod builtin;

pub use builtin::{builtin_factory, Flat, SmaCross, BUILTIN_STRATEGIES};

use crate::domain::{Bar, Timestamp};
use crate::execution::ExecutionSimulator;
use crate::params::ParamSet;

// ─── Errors ──────────────────────────────────────────────────────────

/// Failure raised by an optional strategy hook. Logged and ignored by the engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("strategy hook failed: {message}")]
pub struct HookError {
    pub message: String,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors raised while building a strategy from parameters.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StrategyError {
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),
    #[error("strategy '{strategy}': parameter '{param}' is invalid: {reason}")]
    InvalidParam {
        strategy: String,
        param: String,
        reason: String,
    },
}

// ─── Capability traits ───────────────────────────────────────────────

/// Optional hook: a risk fraction that varies bar to bar.
pub trait DynamicRisk {
    /// Risk per trade in percent of equity (e.g., `1.5` means 1.5%).
    fn effective_risk(&self) -> Result<f64, HookError>;
}

/// Optional hook: observe realized PnL of each finalized trade.
pub trait TradeObserver {
    fn on_trade_closed(&mut self, pnl: f64) -> Result<(), HookError>;
}

// ─── Strategy ────────────────────────────────────────────────────────

/// A pluggable signal policy.
///
/// `on_bar` receives the simulator read-only: strategies may inspect cash,
/// position and ledgers but cannot place orders themselves. The returned
/// signal is interpreted by the engine's sizing mode; `None` means 0.
pub trait Strategy: Send {
    fn name(&self) -> &str;

    /// Called once with the full bar history before the loop starts.
    /// Implementations may precompute indicators here; they must not use
    /// bar t+1 or later when producing the signal for bar t.
    fn bind(&mut self, _bars: &[Bar]) {}

    /// Bars to skip before the first `on_bar` call.
    fn warmup(&self) -> usize {
        0
    }

    fn on_bar(
        &mut self,
        timestamp: Timestamp,
        bar: &Bar,
        index: usize,
        simulator: &ExecutionSimulator,
    ) -> Option<f64>;

    fn dynamic_risk(&self) -> Option<&dyn DynamicRisk> {
        None
    }

    fn trade_observer(&mut self) -> Option<&mut dyn TradeObserver> {
        None
    }
}

/// Builds a fresh strategy instance per parameter set.
///
/// The walk-forward optimizer calls this once per candidate per split, so
/// no state leaks between evaluations.
pub trait StrategyFactory: Send + Sync {
    fn build(&self, params: &ParamSet) -> Result<Box<dyn Strategy>, StrategyError>;
}

impl<F> StrategyFactory for F
where
    F: Fn(&ParamSet) -> Result<Box<dyn Strategy>, StrategyError> + Send + Sync,
{
    fn build(&self, params: &ParamSet) -> Result<Box<dyn Strategy>, StrategyError> {
        self(params)
    }
}
