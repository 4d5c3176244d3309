//! Operation agents: one timed step of a dish card.

mod agent;

pub use agent::*;
