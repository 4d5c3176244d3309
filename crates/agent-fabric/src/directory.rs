//! # Directory Service
//!
//! The yellow pages of the fabric. Agents publish what they can do as a
//! [`ServiceDescription`] (a capability name plus string attributes) and find each other by
//! capability and attribute equality.
//!
//! The directory is itself an actor: a [`DirectoryActor`] owns the registrations and a cheap,
//! cloneable [`DirectoryClient`] talks to it over a channel, the same split as
//! [`ResourceActor`](crate::ResourceActor) / [`ResourceClient`](crate::ResourceClient).
//!
//! Registration happens inside the spawned agent's task, so it is asynchronous relative to
//! `spawn`. A lookup returning an empty list is therefore a normal answer meaning
//! "not there yet": callers poll again later instead of failing.

use crate::address::ActorAddress;
use crate::error::FrameworkError;
use crate::message::Response;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// A capability together with the attributes it is published under.
///
/// Used both for registering and, as a filter, for lookups: a registration matches a
/// filter when the capability is equal and every filter attribute is present with the
/// same value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescription {
    capability: String,
    attributes: BTreeMap<String, String>,
}

impl ServiceDescription {
    pub fn new(capability: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.attributes.insert(key.into(), value.to_string());
        self
    }

    pub fn capability(&self) -> &str {
        &self.capability
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    fn satisfies(&self, filter: &ServiceDescription) -> bool {
        self.capability == filter.capability
            && filter
                .attributes
                .iter()
                .all(|(key, value)| self.attributes.get(key) == Some(value))
    }
}

#[derive(Debug, Clone)]
struct Registration {
    owner: ActorAddress,
    service: ServiceDescription,
}

/// Requests understood by the [`DirectoryActor`].
#[derive(Debug)]
pub enum DirectoryRequest {
    Register {
        owner: ActorAddress,
        service: ServiceDescription,
        respond_to: Response<()>,
    },
    Deregister {
        owner: ActorAddress,
        respond_to: Response<usize>,
    },
    Lookup {
        filter: ServiceDescription,
        respond_to: Response<Vec<ActorAddress>>,
    },
}

/// Owns every registration; processes requests one at a time.
pub struct DirectoryActor {
    receiver: mpsc::Receiver<DirectoryRequest>,
    registrations: Vec<Registration>,
}

impl DirectoryActor {
    pub fn new(buffer_size: usize) -> (Self, DirectoryClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            registrations: Vec::new(),
        };
        (actor, DirectoryClient { sender })
    }

    pub async fn run(mut self) {
        info!("Directory started");

        while let Some(request) = self.receiver.recv().await {
            match request {
                DirectoryRequest::Register {
                    owner,
                    service,
                    respond_to,
                } => {
                    let duplicate = self
                        .registrations
                        .iter()
                        .any(|r| r.owner == owner && r.service == service);
                    if !duplicate {
                        debug!(%owner, capability = service.capability(), "Registered");
                        self.registrations.push(Registration { owner, service });
                    }
                    let _ = respond_to.send(Ok(()));
                }
                DirectoryRequest::Deregister { owner, respond_to } => {
                    let before = self.registrations.len();
                    self.registrations.retain(|r| r.owner != owner);
                    let removed = before - self.registrations.len();
                    debug!(%owner, removed, "Deregistered");
                    let _ = respond_to.send(Ok(removed));
                }
                DirectoryRequest::Lookup { filter, respond_to } => {
                    let mut found: Vec<ActorAddress> = Vec::new();
                    for registration in &self.registrations {
                        if registration.service.satisfies(&filter)
                            && !found.contains(&registration.owner)
                        {
                            found.push(registration.owner.clone());
                        }
                    }
                    let _ = respond_to.send(Ok(found));
                }
            }
        }

        info!(size = self.registrations.len(), "Directory shutdown");
    }
}

/// Cloneable handle to the [`DirectoryActor`].
#[derive(Clone, Debug)]
pub struct DirectoryClient {
    sender: mpsc::Sender<DirectoryRequest>,
}

impl DirectoryClient {
    pub async fn register(
        &self,
        owner: ActorAddress,
        service: ServiceDescription,
    ) -> Result<(), FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(DirectoryRequest::Register {
                owner,
                service,
                respond_to,
            })
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    pub async fn deregister(&self, owner: ActorAddress) -> Result<usize, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(DirectoryRequest::Deregister { owner, respond_to })
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    pub async fn lookup(
        &self,
        filter: ServiceDescription,
    ) -> Result<Vec<ActorAddress>, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(DirectoryRequest::Lookup { filter, respond_to })
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    /// Registers, retrying transport failures up to `attempts` times.
    pub async fn register_with_retry(
        &self,
        owner: &ActorAddress,
        service: &ServiceDescription,
        attempts: u32,
        delay: Duration,
    ) -> Result<(), FrameworkError> {
        for attempt in 1..=attempts {
            match self.register(owner.clone(), service.clone()).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(%owner, capability = service.capability(), attempt, error = %e, "Registration failed");
                    tokio::time::sleep(delay).await;
                }
            }
        }
        Err(FrameworkError::RegistrationFailed {
            capability: service.capability().to_string(),
            attempts,
        })
    }

    /// Looks up, retrying transport failures up to `attempts` times. An empty result is
    /// returned as is.
    pub async fn lookup_with_retry(
        &self,
        filter: &ServiceDescription,
        attempts: u32,
        delay: Duration,
    ) -> Result<Vec<ActorAddress>, FrameworkError> {
        for attempt in 1..=attempts {
            match self.lookup(filter.clone()).await {
                Ok(found) => return Ok(found),
                Err(e) => {
                    warn!(capability = filter.capability(), attempt, error = %e, "Lookup failed");
                    tokio::time::sleep(delay).await;
                }
            }
        }
        Err(FrameworkError::LookupFailed {
            capability: filter.capability().to_string(),
            attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_directory() -> DirectoryClient {
        let (actor, client) = DirectoryActor::new(16);
        tokio::spawn(actor.run());
        client
    }

    #[tokio::test]
    async fn test_lookup_filters_by_attributes() {
        let directory = spawn_directory();
        let oven = ActorAddress::new(1, "oven");
        let grill = ActorAddress::new(2, "grill");

        directory
            .register(oven.clone(), ServiceDescription::new("equipment").with("class", 3))
            .await
            .expect("register oven");
        directory
            .register(grill.clone(), ServiceDescription::new("equipment").with("class", 5))
            .await
            .expect("register grill");

        let all = directory
            .lookup(ServiceDescription::new("equipment"))
            .await
            .expect("lookup all");
        assert_eq!(all, vec![oven.clone(), grill.clone()]);

        let class_five = directory
            .lookup(ServiceDescription::new("equipment").with("class", 5))
            .await
            .expect("lookup class");
        assert_eq!(class_five, vec![grill]);

        let none = directory
            .lookup(ServiceDescription::new("cook"))
            .await
            .expect("empty lookup is not an error");
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_register_is_idempotent_and_deregister_removes_all() {
        let directory = spawn_directory();
        let cook = ActorAddress::new(9, "cook");
        let service = ServiceDescription::new("cook").with("id", 1);

        directory.register(cook.clone(), service.clone()).await.expect("first");
        directory.register(cook.clone(), service.clone()).await.expect("second");
        directory
            .register(cook.clone(), ServiceDescription::new("staff"))
            .await
            .expect("other capability");

        let removed = directory.deregister(cook.clone()).await.expect("deregister");
        assert_eq!(removed, 2, "duplicate registration must not be stored twice");
        assert!(directory.lookup(service).await.expect("lookup").is_empty());
    }

    #[tokio::test]
    async fn test_closed_directory_reports_failure_after_retries() {
        let (actor, directory) = DirectoryActor::new(1);
        drop(actor);

        let result = directory
            .lookup_with_retry(&ServiceDescription::new("menu"), 2, Duration::from_millis(1))
            .await;
        assert!(matches!(
            result,
            Err(FrameworkError::LookupFailed { attempts: 2, .. })
        ));
    }
}
