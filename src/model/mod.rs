//! Pure data structures: the kitchen catalog, orders, outcomes and the report records
//! that implement [`ActorEntity`](agent_fabric::ActorEntity).

pub mod catalog;
pub mod order;
pub mod outcome;
pub mod report;
pub mod timestamp;

pub use catalog::*;
pub use order::*;
pub use outcome::*;
pub use report::*;
