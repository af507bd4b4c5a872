use serde::{Deserialize, Serialize};

use super::Timestamp;

/// A single execution event. Immutable once recorded.
///
/// `cash` and `position` are the simulator state immediately after the fill,
/// so `cash_before - price * quantity - commission == cash`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub timestamp: Timestamp,
    /// Post-slippage execution price.
    pub price: f64,
    /// Signed quantity: positive buys, negative sells.
    pub quantity: f64,
    pub commission: f64,
    pub cash: f64,
    pub position: f64,
}

impl Fill {
    /// Signed cash impact of this fill, commission included.
    pub fn cash_flow(&self) -> f64 {
        -(self.price * self.quantity) - self.commission
    }
}
