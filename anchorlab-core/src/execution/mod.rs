//! Execution simulator: turns signed order quantities into fills and trades.
//!
//! Key concepts:
//! - **Linear costs**: slippage in basis points against the trader, flat
//!   commission per fill
//! - **Cost basis**: size-weighted average entry price, reset when flat
//! - **Trade lifecycle**: open on flat→nonzero, finalize on full close, and a
//!   reversal finalizes one trade and seeds the next in the same fill

pub mod simulator;

pub use simulator::{ExecutionSimulator, SimulatorConfig};
