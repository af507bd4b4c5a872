//! Bar: the fundamental market data unit.

use serde::{Deserialize, Serialize};

use super::Timestamp;

/// One time-stamped OHLCV observation.
///
/// Only `close` is required by the engine. `open`/`high`/`low`/`volume` are
/// optional; volatility sizing needs `high` and `low`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: Timestamp,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub volume: Option<f64>,
}

impl Bar {
    /// Bar carrying only a closing price.
    pub fn from_close(timestamp: Timestamp, close: f64) -> Self {
        Self {
            timestamp,
            open: None,
            high: None,
            low: None,
            close,
            volume: None,
        }
    }

    pub fn with_range(mut self, high: f64, low: f64) -> Self {
        self.high = Some(high);
        self.low = Some(low);
        self
    }

    /// Whether the bar has a usable closing price.
    pub fn has_close(&self) -> bool {
        self.close.is_finite()
    }

    /// High-low range, if both sides are present.
    pub fn range(&self) -> Option<f64> {
        match (self.high, self.low) {
            (Some(h), Some(l)) if h.is_finite() && l.is_finite() => Some(h - l),
            _ => None,
        }
    }
}
