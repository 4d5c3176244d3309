//! # Framework Errors
//!
//! Errors raised by the runtime itself, as opposed to the outcomes agents exchange in
//! their messages. Anything surfacing here is an infrastructure fault: agents propagate
//! it with `?` and the runtime halts the fabric.

/// Errors that can occur within the agent fabric itself.
#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped response channel")]
    ActorDropped,
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Entity error: {0}")]
    EntityError(Box<dyn std::error::Error + Send + Sync>),
    #[error("Registration of '{capability}' failed after {attempts} attempts")]
    RegistrationFailed { capability: String, attempts: u32 },
    #[error("Lookup of '{capability}' failed after {attempts} attempts")]
    LookupFailed { capability: String, attempts: u32 },
    #[error("Fabric halted: {0}")]
    Halted(String),
}
