//! # ActorEntity Trait
//!
//! Contract for records kept by a [`ResourceActor`](crate::ResourceActor): report rows,
//! catalog entries, anything that is created once, mutated by a handful of well-known
//! updates, and finally listed.
//!
//! The associated types make every request type-checked: an operation report only
//! accepts operation-report drafts and updates.
//!
//! # Provided Methods (Hooks)
//! [`ActorEntity::on_create`] and [`ActorEntity::on_delete`] default to `Ok(())`.

use async_trait::async_trait;
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Trait that any record must implement to be managed by a `ResourceActor`.
///
/// # Async & Context
/// Hooks are async and receive the `Context` passed to `ResourceActor::run`, so an entity
/// can consult other actors while validating a change.
#[async_trait]
pub trait ActorEntity: Clone + Send + Sync + 'static {
    /// Identifier handed out by the actor's sequence counter.
    type Id: Eq + Hash + Clone + Send + Sync + Display + Debug + From<u32>;

    /// Data required to create a record.
    type Create: Send + Sync + Debug;

    /// Data required to update a record.
    type Update: Send + Sync + Debug;

    /// Entity-specific operations.
    type Action: Send + Sync + Debug;

    type ActionResult: Send + Sync + Debug;

    /// Runtime dependencies injected into every hook. `()` if none.
    type Context: Send + Sync;

    /// One error enum per entity rather than one per operation.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Builds the record from its freshly allocated id and the creation data.
    fn from_create_params(id: Self::Id, params: Self::Create) -> Result<Self, Self::Error>;

    async fn on_create(&mut self, _ctx: &Self::Context) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn on_update(
        &mut self,
        update: Self::Update,
        _ctx: &Self::Context,
    ) -> Result<(), Self::Error>;

    async fn on_delete(&self, _ctx: &Self::Context) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn handle_action(
        &mut self,
        action: Self::Action,
        _ctx: &Self::Context,
    ) -> Result<Self::ActionResult, Self::Error>;
}
