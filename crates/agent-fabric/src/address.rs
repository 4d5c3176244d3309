//! # Actor Addresses
//!
//! An [`ActorAddress`] names exactly one running agent for its whole lifetime. Addresses are
//! handed out by the [`Fabric`](crate::Fabric) at spawn time and are never reused.

use std::fmt::Display;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Process-unique identity of a spawned agent.
///
/// Equality and hashing only look at the numeric id; the name is carried along for logs.
#[derive(Debug, Clone)]
pub struct ActorAddress {
    id: u64,
    name: Arc<str>,
}

impl ActorAddress {
    pub(crate) fn new(id: u64, name: impl Into<Arc<str>>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for ActorAddress {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ActorAddress {}

impl Hash for ActorAddress {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Display for ActorAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}
