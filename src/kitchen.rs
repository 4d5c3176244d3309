//! What every kitchen agent is built with, and how agents find each other.

use crate::clients::ReportClients;
use crate::config::SimulationConfig;
use crate::console::Console;
use crate::data::KitchenData;
use crate::error::KitchenError;
use crate::protocol::KitchenPayload;
use agent_fabric::{ActorAddress, AgentContext, ServiceDescription};
use std::sync::Arc;
use tracing::debug;

/// Shared, read-only environment of one simulation run.
#[derive(Debug, Clone)]
pub struct Kitchen {
    pub config: Arc<SimulationConfig>,
    pub data: Arc<KitchenData>,
    pub reports: ReportClients,
    pub console: Console,
}

/// Directory lookups for providers that may not have registered yet.
///
/// Registration runs in the registering agent's own task, so a freshly spawned agent may be
/// missing for a moment. A lookup never waits for it: an empty answer schedules the caller's
/// `retry` timer after the fabric's retry delay and returns `None`, and the caller tries again
/// from `on_timer`. Too many empty answers in a row are fatal.
#[derive(Debug, Default)]
pub struct Locator {
    misses: u32,
}

impl Locator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every provider matching `filter`, once there are at least `count` of them.
    pub async fn all<T: Send + 'static>(
        &mut self,
        ctx: &mut AgentContext<KitchenPayload, T>,
        filter: ServiceDescription,
        count: usize,
        retry: T,
    ) -> Result<Option<Vec<ActorAddress>>, KitchenError> {
        let found = ctx.lookup(filter.clone()).await?;
        if found.len() >= count {
            self.misses = 0;
            return Ok(Some(found));
        }

        let settings = ctx.fabric().settings().clone();
        self.misses += 1;
        if self.misses >= settings.registration_attempts {
            return Err(KitchenError::NotRegistered {
                capability: filter.capability().to_string(),
                attempts: settings.registration_attempts,
            });
        }
        debug!(
            capability = filter.capability(),
            found = found.len(),
            count,
            miss = self.misses,
            "Not registered yet"
        );
        ctx.schedule(settings.retry_delay, retry);
        Ok(None)
    }

    /// The first provider matching `filter`, for capabilities with a single provider.
    pub async fn one<T: Send + 'static>(
        &mut self,
        ctx: &mut AgentContext<KitchenPayload, T>,
        filter: ServiceDescription,
        retry: T,
    ) -> Result<Option<ActorAddress>, KitchenError> {
        Ok(self
            .all(ctx, filter, 1, retry)
            .await?
            .and_then(|found| found.into_iter().next()))
    }
}
