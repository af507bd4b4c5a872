//! The bar loop.
//!
//! Setup binds the strategy to the full history and resolves warmup as the
//! larger of the strategy's warmup and the ATR length. Every bar refreshes the
//! market price and appends one equity and one position point. From the
//! warmup bar onward the loop also sizes, asks the strategy for a signal,
//! submits the order, and notifies the strategy of trades finalized by it.

use std::collections::HashSet;

use tracing::{debug, info_span, warn};

use super::config::{validate_bars, EngineConfig, EngineError, SizingMode};
use super::sizing::{resolve_base_size, signal_units};
use super::state::{sort_trades, RunResult};
use crate::domain::{Bar, Series, TradeId};
use crate::execution::ExecutionSimulator;
use crate::indicators::{Atr, Indicator};
use crate::strategy::Strategy;

/// Run `strategy` over `bars` with a fresh simulator.
///
/// Fails before touching any bar when the configuration or the bars are
/// invalid. An empty bar slice yields empty outputs.
pub fn run_backtest(
    bars: &[Bar],
    strategy: &mut dyn Strategy,
    config: &EngineConfig,
) -> Result<RunResult, EngineError> {
    config.validate()?;
    validate_bars(bars)?;

    let span = info_span!("backtest", strategy = strategy.name(), bars = bars.len());
    let _guard = span.enter();

    strategy.bind(bars);

    let atr = config.atr_len.map(Atr::new);
    let warmup = match &atr {
        Some(atr) => strategy.warmup().max(atr.lookback()),
        None => strategy.warmup(),
    };
    let atr_values = atr.map(|atr| atr.compute(bars));

    // Optional capabilities are queried once.
    let has_dynamic_risk = strategy.dynamic_risk().is_some();
    let has_observer = strategy.trade_observer().is_some();

    let mut sim = ExecutionSimulator::new(config.simulator());
    let mut equity_curve = Series::with_capacity(bars.len());
    let mut position_curve = Series::with_capacity(bars.len());
    let mut notified: HashSet<TradeId> = HashSet::new();
    let mut closed_cursor = 0;

    for (index, bar) in bars.iter().enumerate() {
        let timestamp = bar.timestamp;
        let price = bar.close;
        sim.update_market(timestamp, price);

        if index >= warmup {
            let risk_fraction = if has_dynamic_risk {
                effective_risk_fraction(strategy, config.risk_fraction)
            } else {
                config.risk_fraction
            };
            let atr_value = atr_values
                .as_ref()
                .and_then(|v| v.get(index).copied())
                .filter(|v| v.is_finite());
            let size = resolve_base_size(config, price, sim.equity(), risk_fraction, atr_value);

            let raw = strategy.on_bar(timestamp, bar, index, &sim).unwrap_or(0.0);
            let units = signal_units(raw).unwrap_or_else(|| {
                warn!(index, signal = raw, "non-finite signal treated as 0");
                0.0
            });
            let quantity = units * size;

            match config.mode {
                SizingMode::Delta => sim.order_delta(quantity, price, timestamp),
                SizingMode::Target => sim.order_target(quantity, price, timestamp),
            };

            if has_observer {
                closed_cursor = notify_closed_trades(strategy, &sim, closed_cursor, &mut notified);
            }
        }

        equity_curve.push(timestamp, sim.equity());
        position_curve.push(timestamp, sim.position());
    }

    debug!(
        fills = sim.fills().len(),
        trades = sim.trades().len(),
        final_equity = sim.equity(),
        "backtest complete"
    );

    let (fills, mut trades) = sim.into_ledgers();
    sort_trades(&mut trades);

    Ok(RunResult {
        equity_curve,
        position_curve,
        fills,
        trades,
        warmup_bars: warmup,
    })
}

/// Static risk fraction, overridden by the strategy's percent-valued hook.
fn effective_risk_fraction(strategy: &dyn Strategy, fallback: f64) -> f64 {
    let Some(hook) = strategy.dynamic_risk() else {
        return fallback;
    };
    match hook.effective_risk() {
        Ok(pct) if pct.is_finite() => (pct / 100.0).max(0.0),
        Ok(pct) => {
            warn!(risk = pct, "non-finite effective risk ignored");
            fallback
        }
        Err(err) => {
            warn!(error = %err, "effective risk hook failed, using static risk fraction");
            fallback
        }
    }
}

/// Report each newly finalized trade exactly once. Returns the new cursor.
fn notify_closed_trades(
    strategy: &mut dyn Strategy,
    sim: &ExecutionSimulator,
    cursor: usize,
    notified: &mut HashSet<TradeId>,
) -> usize {
    let closed = sim.closed_trade_ids();
    for &id in &closed[cursor..] {
        if !notified.insert(id) {
            continue;
        }
        let pnl = sim.trade(id).and_then(|t| t.pnl).unwrap_or(0.0);
        if let Some(observer) = strategy.trade_observer() {
            if let Err(err) = observer.on_trade_closed(pnl) {
                warn!(error = %err, trade = id.0, pnl, "trade-closed hook failed, ignoring");
            }
        }
    }
    closed.len()
}
