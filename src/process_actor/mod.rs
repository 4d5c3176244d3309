//! Process agents: the cooking of one ordered dish.

mod agent;

pub use agent::*;
