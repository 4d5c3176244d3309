//! The warehouse: stock lots, holds and consumption.

mod agent;
pub mod ledger;

pub use agent::*;
pub use ledger::StockLedger;
