//! Run result: per-bar curves plus the fill and trade ledgers.

use serde::{Deserialize, Serialize};

use crate::domain::{Fill, Series, Timestamp, Trade};

/// Output of one backtest run.
///
/// `equity_curve` and `position_curve` hold exactly one entry per input bar,
/// warmup bars included. `trades` are ordered by exit time; open trades
/// (no exit) come last in entry order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub equity_curve: Series,
    pub position_curve: Series,
    pub fills: Vec<Fill>,
    pub trades: Vec<Trade>,
    pub warmup_bars: usize,
}

impl RunResult {
    pub fn bar_count(&self) -> usize {
        self.equity_curve.len()
    }

    pub fn final_equity(&self) -> Option<f64> {
        self.equity_curve.last().map(|(_, v)| v)
    }

    pub fn closed_trades(&self) -> impl Iterator<Item = &Trade> {
        self.trades.iter().filter(|t| !t.is_open())
    }

    /// Restrict the run to the inclusive window `[start, end]`.
    ///
    /// Curves and fills are cut to the window. A trade is kept when it overlaps
    /// the window: it entered no later than `end` and is either still open or
    /// exited no earlier than `start`.
    pub fn slice_between(&self, start: Timestamp, end: Timestamp) -> RunResult {
        RunResult {
            equity_curve: self.equity_curve.slice_between(start, end),
            position_curve: self.position_curve.slice_between(start, end),
            fills: self
                .fills
                .iter()
                .filter(|f| f.timestamp >= start && f.timestamp <= end)
                .cloned()
                .collect(),
            trades: self
                .trades
                .iter()
                .filter(|t| t.entry_time <= end && t.exit_time.map_or(true, |x| x >= start))
                .cloned()
                .collect(),
            warmup_bars: 0,
        }
    }
}

/// Sort trades by exit time, open trades last. Stable, so ties keep ledger order.
pub(crate) fn sort_trades(trades: &mut [Trade]) {
    trades.sort_by_key(|t| (t.exit_time.is_none(), t.exit_time));
}
