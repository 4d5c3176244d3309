//! Error types for the report ledgers.

use thiserror::Error;

/// Errors that can occur while writing report records.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReportError {
    /// The record to update does not exist.
    #[error("Report not found: {0}")]
    NotFound(String),

    /// The record was already closed with an end time.
    #[error("Report already ended: {0}")]
    AlreadyEnded(String),

    /// An error occurred while communicating with the ledger.
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<String> for ReportError {
    fn from(msg: String) -> Self {
        ReportError::ActorCommunicationError(msg)
    }
}
