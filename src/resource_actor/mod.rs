//! Cooks and equipment units as reservable agents.

mod agent;

pub use agent::*;

use crate::model::{Cook, Equipment};

pub fn cook(cook: &Cook, factor: f64) -> ResourceAgent {
    ResourceAgent::new(ResourceKind::Cook(cook.id), factor)
}

pub fn equipment(unit: &Equipment, factor: f64) -> ResourceAgent {
    ResourceAgent::new(
        ResourceKind::Equipment {
            id: unit.id,
            class: unit.class,
        },
        factor,
    )
}
