//! # Kitchen Time Model
//!
//! A [`KitchenSnapshot`] holds, for every cook and for every equipment unit grouped by class,
//! the scaled seconds until it is free, each list sorted ascending. The projections walk an
//! operation chain against a private copy of those lists:
//!
//! - an operation starts at `max(first free cook, first free unit of its class)` (no class: 0),
//!   or immediately if the chain is already past that point;
//! - the gap between the chain's running total and that start is idle time;
//! - the chosen cook and unit are then busy for the operation's duration, and the lists are
//!   re-sorted for the next operation.
//!
//! A missing resource (no cooks, or no unit of a class) never frees up: the projection is
//! infinite.

use crate::model::{EquipmentClass, Operation};
use std::collections::HashMap;

/// Completion and idle time of one chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub completion: f64,
    pub idle: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KitchenSnapshot {
    cooks: Vec<f64>,
    equipment: HashMap<EquipmentClass, Vec<f64>>,
}

impl KitchenSnapshot {
    /// Builds a snapshot from remaining-time replies; `None` marks a cook.
    pub fn from_remaining_times<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = (Option<EquipmentClass>, f64)>,
    {
        let mut snapshot = Self::default();
        for (class, seconds) in replies {
            let seconds = seconds.max(0.0);
            match class {
                None => snapshot.cooks.push(seconds),
                Some(class) => snapshot.equipment.entry(class).or_default().push(seconds),
            }
        }
        snapshot.cooks.sort_by(f64::total_cmp);
        for slots in snapshot.equipment.values_mut() {
            slots.sort_by(f64::total_cmp);
        }
        snapshot
    }

    pub fn cooks(&self) -> &[f64] {
        &self.cooks
    }

    pub fn equipment(&self, class: EquipmentClass) -> &[f64] {
        self.equipment.get(&class).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_equipment(&self, class: EquipmentClass) -> bool {
        !self.equipment(class).is_empty()
    }

    /// Walks one chain of operations; durations are unscaled and multiplied by `factor`.
    pub fn project(&self, operations: &[Operation], factor: f64) -> Projection {
        let mut walk = Walk::from(self);
        walk.chain(operations, factor)
    }

    pub fn completion_time(&self, operations: &[Operation], factor: f64) -> f64 {
        self.project(operations, factor).completion
    }

    pub fn idle_time(&self, operations: &[Operation], factor: f64) -> f64 {
        self.project(operations, factor).idle
    }

    /// Idle time shrunk by priority; the ranking key of the scheduler.
    pub fn effective_wait(&self, operations: &[Operation], priority: u32, factor: f64) -> f64 {
        self.idle_time(operations, factor) / f64::from(priority.max(1))
    }

    /// Completion time of several dishes cooked on the same kitchen: each dish walks the
    /// pool left over by the dishes before it, and the slowest dish decides.
    pub fn dishes_completion_time<'a, I>(&self, dishes: I, factor: f64) -> f64
    where
        I: IntoIterator<Item = &'a [Operation]>,
    {
        let mut walk = Walk::from(self);
        dishes
            .into_iter()
            .map(|operations| walk.chain(operations, factor).completion)
            .fold(0.0, f64::max)
    }
}

/// The private, mutable copy a projection walks on.
struct Walk {
    cooks: Vec<f64>,
    equipment: HashMap<EquipmentClass, Vec<f64>>,
}

impl From<&KitchenSnapshot> for Walk {
    fn from(snapshot: &KitchenSnapshot) -> Self {
        Self {
            cooks: snapshot.cooks.clone(),
            equipment: snapshot.equipment.clone(),
        }
    }
}

impl Walk {
    fn chain(&mut self, operations: &[Operation], factor: f64) -> Projection {
        let mut completion = 0.0;
        let mut idle = 0.0;

        for operation in operations {
            let duration = operation.duration * factor;
            let cook_free = first_free(&self.cooks);
            let equipment_free = match operation.equipment_class {
                None => 0.0,
                Some(class) => self.equipment.get(&class).map_or(f64::INFINITY, |s| first_free(s)),
            };

            let wait = (cook_free.max(equipment_free) - completion).max(0.0);
            completion += wait + duration;
            idle += wait;

            occupy(&mut self.cooks, duration);
            if let Some(slots) = operation
                .equipment_class
                .and_then(|class| self.equipment.get_mut(&class))
            {
                occupy(slots, duration);
            }
        }

        Projection { completion, idle }
    }
}

fn first_free(slots: &[f64]) -> f64 {
    slots.first().copied().unwrap_or(f64::INFINITY)
}

fn occupy(slots: &mut [f64], duration: f64) {
    if let Some(first) = slots.first_mut() {
        *first += duration;
    }
    slots.sort_by(f64::total_cmp);
}
