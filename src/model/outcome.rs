//! How a dish or a menu item ended up, as values rather than errors.

use crate::model::catalog::{CardId, EquipmentClass, OperationKind, ProductClass};
use std::fmt::Display;

/// Final state of one ordered dish.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Served,
    Cancelled,
    Failed(FailureReason),
}

impl Outcome {
    pub fn is_served(&self) -> bool {
        matches!(self, Outcome::Served)
    }
}

/// Why cooking stopped before the dish was ready.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    InsufficientProducts(ProductClass),
}

impl Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::InsufficientProducts(class) => {
                write!(f, "not enough {class} in the warehouse")
            }
        }
    }
}

/// Why a menu dish is left out of the active menu.
#[derive(Debug, Clone, PartialEq)]
pub enum ExclusionReason {
    Inactive,
    UnknownCard(CardId),
    MissingOperationKind(OperationKind),
    InsufficientProducts(ProductClass),
    MissingEquipment(EquipmentClass),
    TooSlow { seconds: f64, threshold: f64 },
}

impl Display for ExclusionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExclusionReason::Inactive => write!(f, "dish is inactive"),
            ExclusionReason::UnknownCard(card) => write!(f, "{card} does not exist"),
            ExclusionReason::MissingOperationKind(kind) => {
                write!(f, "nobody in the kitchen can do {kind}")
            }
            ExclusionReason::InsufficientProducts(class) => {
                write!(f, "not enough {class} in the warehouse")
            }
            ExclusionReason::MissingEquipment(class) => write!(f, "no active {class}"),
            ExclusionReason::TooSlow { seconds, threshold } => {
                write!(f, "takes {seconds:.2}s, limit is {threshold:.2}s")
            }
        }
    }
}
