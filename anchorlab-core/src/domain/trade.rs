//! Trade: one entry-to-exit position episode, possibly spanning many fills.

use serde::{Deserialize, Serialize};

use super::Timestamp;

/// Stable identity of a trade within one simulator's ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TradeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// Direction of a nonzero signed quantity.
    pub fn of(quantity: f64) -> Self {
        if quantity > 0.0 {
            Self::Long
        } else {
            Self::Short
        }
    }

    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            Self::Long => 1.0,
            Self::Short => -1.0,
        }
    }
}

/// A position episode from the fill that opened it to the fill that flattened
/// (or reversed) it.
///
/// Size semantics:
/// - `quantity` is the signed exposure still open. Partial closes shrink it,
///   adds grow it, and it is `0.0` once the trade is finalized.
/// - `entry_quantity` is the signed size accumulated by the opening fill and
///   every add. Partial closes never reduce it.
///
/// `partial_pnl` accumulates realized PnL from partial closes while the trade
/// is open. `pnl` is set at finalization and covers only the exposure closed
/// by the final fill, so `pnl = (exit - entry) * closed * sign` and
/// `return_pct = pnl / (entry_price * closed)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub direction: Direction,

    // ── Entry ──
    pub entry_time: Timestamp,
    /// Size-weighted average entry price (re-blended on adds).
    pub entry_price: f64,
    pub entry_quantity: f64,

    // ── Open exposure ──
    pub quantity: f64,
    pub partial_pnl: f64,

    // ── Exit ──
    pub exit_time: Option<Timestamp>,
    pub exit_price: Option<f64>,
    pub pnl: Option<f64>,
    pub return_pct: Option<f64>,
}

impl Trade {
    pub(crate) fn open(id: TradeId, entry_time: Timestamp, quantity: f64, price: f64) -> Self {
        Self {
            id,
            direction: Direction::of(quantity),
            entry_time,
            entry_price: price,
            entry_quantity: quantity,
            quantity,
            partial_pnl: 0.0,
            exit_time: None,
            exit_price: None,
            pnl: None,
            return_pct: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.exit_time.is_none()
    }

    pub fn is_winner(&self) -> bool {
        self.pnl.is_some_and(|p| p > 0.0)
    }

    /// Everything realized over the trade's life: partial closes plus the
    /// final close.
    pub fn realized_pnl(&self) -> f64 {
        self.partial_pnl + self.pnl.unwrap_or(0.0)
    }
}
