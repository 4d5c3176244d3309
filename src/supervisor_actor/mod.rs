//! The supervisor: order intake and the scheduling cycle.

mod agent;
pub mod plan;

pub use agent::*;
pub use plan::{plan_activations, Plan};
