//! Dish agents: one per ordered dish.

mod agent;

pub use agent::*;
