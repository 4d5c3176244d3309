//! Starting, running and stopping a simulation, and the log subscriber the binary installs.
//!
//! See [`restaurant`] for how a run is wired and [`tracing`] for what gets logged.

pub mod restaurant;
pub mod tracing;

pub use restaurant::{Restaurant, SimulationError};
