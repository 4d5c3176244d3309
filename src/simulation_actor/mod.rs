//! The simulation agent: kitchen start-up and visitor arrivals.

mod agent;

pub use agent::*;
