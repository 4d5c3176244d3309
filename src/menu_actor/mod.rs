//! The menu: kitchen snapshot, time estimates and the active menu.

pub mod actualize;
mod agent;

pub use actualize::{actualize, Actualization, Rules};
pub use agent::*;
