//! # Ledger Requests
//!
//! Request types exchanged between a [`ResourceClient`](crate::ResourceClient) and its
//! [`ResourceActor`](crate::ResourceActor). Unlike agent messages these are plain
//! request/response calls: each carries a oneshot sender for its answer.

use crate::entity::ActorEntity;
use crate::error::FrameworkError;
use tokio::sync::oneshot;

/// Type alias for the one-shot response channel used by request/response actors.
pub type Response<T> = oneshot::Sender<Result<T, FrameworkError>>;

/// Operations a [`ResourceActor`](crate::ResourceActor) understands.
///
/// The set is the CRUD lifecycle of a record plus `List` for draining a ledger and an
/// entity-specific `Action` for mutations that do not fit a plain update.
#[derive(Debug)]
pub enum ResourceRequest<T: ActorEntity> {
    Create {
        params: T::Create,
        respond_to: Response<T::Id>,
    },
    Get {
        id: T::Id,
        respond_to: Response<Option<T>>,
    },
    List {
        respond_to: Response<Vec<T>>,
    },
    Update {
        id: T::Id,
        update: T::Update,
        respond_to: Response<T>,
    },
    Delete {
        id: T::Id,
        respond_to: Response<()>,
    },
    Action {
        id: T::Id,
        action: T::Action,
        respond_to: Response<T::ActionResult>,
    },
}
