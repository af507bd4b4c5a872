//! Single-instrument execution simulator.
//!
//! Owns cash, signed position, average cost and the fill/trade ledgers. Every
//! nonzero order is applied as one indivisible step: cash, position, average
//! price, trade ledger and fill record are all updated before the call returns.
//! Nothing here rejects an order; negative equity is reported, not prevented.

use serde::{Deserialize, Serialize};

use crate::domain::{Fill, Timestamp, Trade, TradeId};

/// Cost model and starting capital for one simulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    pub starting_cash: f64,
    /// Flat commission charged on every fill.
    pub commission: f64,
    /// Slippage in basis points of price, always against the trader.
    pub slippage_bps: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            starting_cash: 100_000.0,
            commission: 0.0,
            slippage_bps: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionSimulator {
    config: SimulatorConfig,
    cash: f64,
    position: f64,
    average_price: f64,
    /// Last market price seen. `None` until the first `update_market` or fill.
    last_price: Option<f64>,
    last_timestamp: Option<Timestamp>,
    realized_pnl: f64,
    commission_paid: f64,
    fills: Vec<Fill>,
    trades: Vec<Trade>,
    open_trade: Option<TradeId>,
    /// Trade ids in the order they were finalized.
    closed: Vec<TradeId>,
}

impl ExecutionSimulator {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            cash: config.starting_cash,
            position: 0.0,
            average_price: 0.0,
            last_price: None,
            last_timestamp: None,
            realized_pnl: 0.0,
            commission_paid: 0.0,
            fills: Vec::new(),
            trades: Vec::new(),
            open_trade: None,
            closed: Vec::new(),
        }
    }

    // ─── Market ─────────────────────────────────────────────────────

    /// Refresh the mark price. Call before any order on the same bar.
    pub fn update_market(&mut self, timestamp: Timestamp, price: f64) {
        self.last_price = Some(price);
        self.last_timestamp = Some(timestamp);
    }

    // ─── Orders ─────────────────────────────────────────────────────

    /// Apply a signed quantity increment at `price` (pre-slippage).
    ///
    /// Returns the recorded fill, or `None` for a zero (or non-finite) quantity.
    pub fn order_delta(&mut self, delta: f64, price: f64, timestamp: Timestamp) -> Option<&Fill> {
        self.execute(delta, price, timestamp)
    }

    /// Move the position to an absolute signed `target`.
    pub fn order_target(&mut self, target: f64, price: f64, timestamp: Timestamp) -> Option<&Fill> {
        self.execute(target - self.position, price, timestamp)
    }

    fn execute(&mut self, delta: f64, price: f64, timestamp: Timestamp) -> Option<&Fill> {
        if delta == 0.0 || !delta.is_finite() {
            return None;
        }
        if self.last_price.is_none() {
            self.last_price = Some(price);
        }

        let direction = delta.signum();
        let slippage = price * self.config.slippage_bps / 10_000.0;
        let fill_price = price + slippage * direction;
        let commission = self.config.commission;

        let old = self.position;
        let new = old + delta;

        self.cash -= fill_price * delta + commission;
        self.commission_paid += commission;

        if old == 0.0 || old.signum() == direction {
            self.open_or_add(old, delta, new, fill_price, timestamp);
        } else {
            self.reduce_or_reverse(old, delta, new, fill_price, timestamp);
        }

        self.position = new;
        if new == 0.0 {
            self.average_price = 0.0;
        }
        self.last_price = Some(fill_price);

        self.fills.push(Fill {
            timestamp,
            price: fill_price,
            quantity: delta,
            commission,
            cash: self.cash,
            position: self.position,
        });
        self.fills.last()
    }

    fn open_or_add(&mut self, old: f64, delta: f64, new: f64, fill_price: f64, timestamp: Timestamp) {
        if old == 0.0 {
            self.average_price = fill_price;
            self.open_new_trade(timestamp, new, fill_price);
            return;
        }

        let held = old.abs();
        let added = delta.abs();
        self.average_price = (self.average_price * held + fill_price * added) / (held + added);

        let average_price = self.average_price;
        if let Some(trade) = self.open_trade_mut() {
            trade.entry_quantity += delta;
            trade.quantity = new;
            trade.entry_price = average_price;
        }
    }

    fn reduce_or_reverse(
        &mut self,
        old: f64,
        delta: f64,
        new: f64,
        fill_price: f64,
        timestamp: Timestamp,
    ) {
        let closed_qty = delta.abs().min(old.abs());
        let pnl = (fill_price - self.average_price) * closed_qty * old.signum();
        self.realized_pnl += pnl;

        if delta.abs() < old.abs() {
            if let Some(trade) = self.open_trade_mut() {
                trade.partial_pnl += pnl;
                trade.quantity = new;
            }
            return;
        }

        if let Some(id) = self.open_trade.take() {
            if let Some(trade) = self.trades.get_mut(id.0) {
                // pnl and return cover the exposure closed by this fill only;
                // earlier partial closes stay in `partial_pnl`.
                let basis = trade.entry_price * closed_qty;
                trade.exit_time = Some(timestamp);
                trade.exit_price = Some(fill_price);
                trade.pnl = Some(pnl);
                trade.return_pct = (basis != 0.0).then(|| pnl / basis);
                trade.quantity = 0.0;
                self.closed.push(id);
            }
        }
        self.average_price = 0.0;

        if new != 0.0 {
            self.average_price = fill_price;
            self.open_new_trade(timestamp, new, fill_price);
        }
    }

    fn open_new_trade(&mut self, timestamp: Timestamp, quantity: f64, price: f64) {
        let id = TradeId(self.trades.len());
        self.trades.push(Trade::open(id, timestamp, quantity, price));
        self.open_trade = Some(id);
    }

    fn open_trade_mut(&mut self) -> Option<&mut Trade> {
        let id = self.open_trade?;
        self.trades.get_mut(id.0)
    }

    // ─── State ──────────────────────────────────────────────────────

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn average_price(&self) -> f64 {
        self.average_price
    }

    pub fn last_price(&self) -> Option<f64> {
        self.last_price
    }

    pub fn last_timestamp(&self) -> Option<Timestamp> {
        self.last_timestamp
    }

    /// Cash plus position marked at the last market price.
    pub fn equity(&self) -> f64 {
        self.cash + self.position * self.last_price.unwrap_or(0.0)
    }

    /// Mark-to-market PnL of the open position against its cost basis.
    pub fn unrealized_pnl(&self) -> f64 {
        match self.last_price {
            Some(p) if self.position != 0.0 => (p - self.average_price) * self.position,
            _ => 0.0,
        }
    }

    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    pub fn commission_paid(&self) -> f64 {
        self.commission_paid
    }

    // ─── Ledgers ────────────────────────────────────────────────────

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    /// Every trade in creation order, open ones included.
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn open_trade(&self) -> Option<&Trade> {
        self.open_trade.and_then(|id| self.trades.get(id.0))
    }

    pub fn trade(&self, id: TradeId) -> Option<&Trade> {
        self.trades.get(id.0)
    }

    /// Ids of finalized trades, in finalization order.
    pub fn closed_trade_ids(&self) -> &[TradeId] {
        &self.closed
    }

    /// Consume the simulator, returning its fill and trade ledgers.
    pub fn into_ledgers(self) -> (Vec<Fill>, Vec<Trade>) {
        (self.fills, self.trades)
    }
}
