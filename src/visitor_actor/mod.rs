//! Visitor agents, one per scheduled visitor order.

mod agent;

pub use agent::*;
