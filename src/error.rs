//! Error type shared by the kitchen agents.
//!
//! Returning one of these from an agent hook is fatal: the fabric halts and the run ends
//! with the message. Running out of stock or equipment is not an error; it travels as an
//! [`Outcome`](crate::model::Outcome) or an [`ExclusionReason`](crate::model::ExclusionReason).

use crate::model::{CardId, MenuDishId};
use crate::report_actor::ReportError;
use agent_fabric::FrameworkError;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum KitchenError {
    /// Nobody registered the capability, even after polling the directory.
    #[error("No '{capability}' registered after {attempts} lookups")]
    NotRegistered { capability: String, attempts: u32 },

    #[error("Unknown dish card: {0}")]
    UnknownCard(CardId),

    #[error("Unknown menu dish: {0}")]
    UnknownMenuDish(MenuDishId),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    /// An error occurred while talking to the fabric or the directory.
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<String> for KitchenError {
    fn from(msg: String) -> Self {
        KitchenError::ActorCommunicationError(msg)
    }
}

impl From<FrameworkError> for KitchenError {
    fn from(e: FrameworkError) -> Self {
        KitchenError::ActorCommunicationError(e.to_string())
    }
}
