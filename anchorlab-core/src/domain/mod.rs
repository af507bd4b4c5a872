//! Domain types for anchorlab

pub mod bar;
pub mod fill;
pub mod series;
pub mod trade;

pub use bar::Bar;
pub use fill::Fill;
pub use series::Series;
pub use trade::{Direction, Trade, TradeId};

/// Bar timestamp. All series, fills and trades share this clock.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
