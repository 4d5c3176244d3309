//! Order agents: one per accepted order.

mod agent;

pub use agent::*;
