//! # ActorClient Trait
//!
//! Shared surface for ledger-specific clients: wrap a [`ResourceClient`], say how framework
//! errors map into your own error type, and `get` / `list` / `delete` come for free.
use crate::{ActorEntity, FrameworkError, ResourceClient};
use async_trait::async_trait;

/// Trait for resource-specific clients to inherit the read side of the CRUD surface.
///
/// # Example
///
/// ```rust
/// use agent_fabric::{ActorClient, ActorEntity, FrameworkError, ResourceClient};
/// use async_trait::async_trait;
///
/// #[derive(Clone, Debug)] struct Shift { id: u32 }
/// #[derive(Debug)] struct ShiftDraft;
/// #[derive(Debug, thiserror::Error)] #[error("{0}")] struct ShiftError(String);
/// impl From<String> for ShiftError { fn from(s: String) -> Self { ShiftError(s) } }
///
/// #[async_trait]
/// impl ActorEntity for Shift {
///     type Id = u32; type Create = ShiftDraft; type Update = (); type Action = ();
///     type ActionResult = (); type Context = (); type Error = ShiftError;
///     fn from_create_params(id: u32, _: ShiftDraft) -> Result<Self, Self::Error> { Ok(Self { id }) }
///     async fn on_update(&mut self, _: (), _: &()) -> Result<(), Self::Error> { Ok(()) }
///     async fn handle_action(&mut self, _: (), _: &()) -> Result<(), Self::Error> { Ok(()) }
/// }
///
/// struct ShiftClient { inner: ResourceClient<Shift> }
///
/// #[async_trait]
/// impl ActorClient<Shift> for ShiftClient {
///     type Error = ShiftError;
///     fn inner(&self) -> &ResourceClient<Shift> { &self.inner }
///     fn map_error(e: FrameworkError) -> Self::Error { ShiftError(e.to_string()) }
/// }
///
/// async fn roster(client: ShiftClient) -> Result<usize, ShiftError> {
///     Ok(client.list().await?.len())
/// }
/// ```
#[async_trait]
pub trait ActorClient<T: ActorEntity>: Send + Sync {
    /// The resource-specific error type.
    type Error: From<String> + Send + Sync;

    /// Access the inner generic ResourceClient.
    fn inner(&self) -> &ResourceClient<T>;

    /// Map framework errors to the specific resource error type.
    fn map_error(e: FrameworkError) -> Self::Error;

    #[tracing::instrument(skip(self))]
    async fn get(&self, id: T::Id) -> Result<Option<T>, Self::Error> {
        tracing::debug!("Sending request");
        self.inner().get(id).await.map_err(Self::map_error)
    }

    /// Every record, in creation order.
    #[tracing::instrument(skip(self))]
    async fn list(&self) -> Result<Vec<T>, Self::Error> {
        tracing::debug!("Sending request");
        self.inner().list().await.map_err(Self::map_error)
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: T::Id) -> Result<(), Self::Error> {
        tracing::debug!("Sending request");
        self.inner().delete(id).await.map_err(Self::map_error)
    }
}
