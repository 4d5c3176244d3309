//! # The Fabric
//!
//! The [`Fabric`] is the post office of an agent system. It hands out addresses, keeps one
//! unbounded mailbox per live agent, routes messages to those mailboxes, and tracks the
//! agent tasks so the whole population can be shut down and awaited.
//!
//! ## Lifecycle
//!
//! 1. **Spawn**: [`Fabric::spawn`] allocates an address, opens the mailbox, and starts the
//!    agent's run loop in its own Tokio task. The mailbox exists before `spawn` returns,
//!    so messages sent right away are queued, not lost.
//! 2. **Run**: the agent publishes its services, then processes messages and timers.
//! 3. **Retire**: when the loop ends the mailbox is closed and the directory entries are
//!    withdrawn.
//!
//! ## Halting
//!
//! A fatal fault in any agent calls [`Fabric::halt`] with a diagnostic. The first reason
//! wins; whoever drives the system waits on [`Fabric::halted`] and shuts everything down.

use crate::acl::{Message, Payload};
use crate::address::ActorAddress;
use crate::agent::{run_agent, Agent};
use crate::context::AgentContext;
use crate::directory::DirectoryClient;
use crate::pattern::Pattern;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// What a mailbox can receive.
#[derive(Debug)]
pub(crate) enum Delivery<P> {
    Message(Arc<Message<P>>),
    Shutdown,
}

/// Retry policy for directory calls made on behalf of agents.
#[derive(Debug, Clone)]
pub struct FabricSettings {
    pub registration_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for FabricSettings {
    fn default() -> Self {
        Self {
            registration_attempts: 10,
            retry_delay: Duration::from_millis(200),
        }
    }
}

struct FabricInner<P> {
    post_office: DashMap<u64, mpsc::UnboundedSender<Delivery<P>>>,
    directory: DirectoryClient,
    next_id: AtomicU64,
    tasks: Mutex<JoinSet<()>>,
    halt: watch::Sender<Option<String>>,
    settings: FabricSettings,
}

/// Cloneable handle to a population of agents sharing one payload type.
pub struct Fabric<P> {
    inner: Arc<FabricInner<P>>,
}

impl<P> Clone for Fabric<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: Payload> Fabric<P> {
    pub fn new(directory: DirectoryClient, settings: FabricSettings) -> Self {
        let (halt, _) = watch::channel(None);
        Self {
            inner: Arc::new(FabricInner {
                post_office: DashMap::new(),
                directory,
                next_id: AtomicU64::new(1),
                tasks: Mutex::new(JoinSet::new()),
                halt,
                settings,
            }),
        }
    }

    pub fn directory(&self) -> &DirectoryClient {
        &self.inner.directory
    }

    pub fn settings(&self) -> &FabricSettings {
        &self.inner.settings
    }

    /// Starts `agent` in its own task and returns its address.
    pub fn spawn<A>(&self, agent: A) -> ActorAddress
    where
        A: Agent<Payload = P>,
    {
        let (address, mailbox) = self.open_mailbox(agent.name());
        let ctx = AgentContext::new(address.clone(), self.clone());
        self.inner
            .tasks
            .lock()
            .spawn(run_agent(agent, mailbox, ctx));
        debug!(agent = %address, "Spawned");
        address
    }

    /// Opens a mailbox that is read from outside any agent, e.g. by a driver or a test.
    pub fn probe(&self, name: impl Into<String>) -> Probe<P> {
        let (address, mailbox) = self.open_mailbox(name.into());
        Probe {
            address,
            fabric: self.clone(),
            mailbox,
            stash: VecDeque::new(),
        }
    }

    /// Number of open mailboxes (agents and probes).
    pub fn live_mailboxes(&self) -> usize {
        self.inner.post_office.len()
    }

    /// Halts the system with `reason`. Only the first reason is kept.
    pub fn halt(&self, reason: impl Into<String>) {
        let reason = reason.into();
        let first = self.inner.halt.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(reason.clone());
                true
            } else {
                false
            }
        });
        if first {
            error!(%reason, "Fabric halted");
        }
    }

    /// Reason passed to the first [`Fabric::halt`], if any.
    pub fn halt_reason(&self) -> Option<String> {
        self.inner.halt.borrow().clone()
    }

    /// Resolves once [`Fabric::halt`] has been called.
    pub async fn halted(&self) -> String {
        let mut receiver = self.inner.halt.subscribe();
        let reason = receiver
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|reason| reason.clone());
        match reason {
            Some(reason) => reason,
            None => std::future::pending().await,
        }
    }

    /// Stops every agent and waits for all of their tasks, including agents spawned while
    /// the shutdown is in progress.
    pub async fn shutdown(&self) {
        info!(live = self.live_mailboxes(), "Shutting down fabric...");
        loop {
            for entry in self.inner.post_office.iter() {
                let _ = entry.value().send(Delivery::Shutdown);
            }

            let mut tasks = std::mem::take(&mut *self.inner.tasks.lock());
            if tasks.is_empty() {
                break;
            }
            while let Some(result) = tasks.join_next().await {
                if let Err(e) = result {
                    error!(error = %e, "Agent task failed");
                }
            }
        }
        info!("Fabric shutdown complete.");
    }

    pub(crate) fn deliver(&self, message: Message<P>) -> usize {
        let message = Arc::new(message);
        let mut delivered = 0;
        for receiver in message.receivers() {
            let sent = self
                .inner
                .post_office
                .get(&receiver.id())
                .map(|mailbox| mailbox.send(Delivery::Message(Arc::clone(&message))).is_ok())
                .unwrap_or(false);
            if sent {
                delivered += 1;
            } else {
                debug!(
                    to = %receiver,
                    performative = %message.performative(),
                    conversation = message.conversation(),
                    "Undeliverable"
                );
            }
        }
        delivered
    }

    pub(crate) async fn retire(&self, address: &ActorAddress) {
        self.inner.post_office.remove(&address.id());
        if let Err(e) = self.inner.directory.deregister(address.clone()).await {
            debug!(agent = %address, error = %e, "Deregistration skipped");
        }
    }

    fn open_mailbox(&self, name: String) -> (ActorAddress, mpsc::UnboundedReceiver<Delivery<P>>) {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let address = ActorAddress::new(id, name);
        let (sender, mailbox) = mpsc::unbounded_channel();
        self.inner.post_office.insert(id, sender);
        (address, mailbox)
    }
}

/// A mailbox without an agent behind it.
///
/// Drivers and tests use a probe to talk to agents: it has an address, can send, and can
/// wait for a message matching a [`Pattern`]. Non-matching messages are kept for later
/// `receive` calls, exactly like an agent mailbox.
pub struct Probe<P: Payload> {
    address: ActorAddress,
    fabric: Fabric<P>,
    mailbox: mpsc::UnboundedReceiver<Delivery<P>>,
    stash: VecDeque<Arc<Message<P>>>,
}

impl<P: Payload> Probe<P> {
    pub fn address(&self) -> &ActorAddress {
        &self.address
    }

    pub fn send(&self, message: Message<P>) -> usize {
        self.fabric.deliver(message.stamp(self.address.clone()))
    }

    /// Oldest message matching `pattern`, or `None` once `timeout` has passed.
    pub async fn receive(
        &mut self,
        pattern: &Pattern,
        timeout: Duration,
    ) -> Option<Arc<Message<P>>> {
        if let Some(position) = self.stash.iter().position(|m| pattern.matches(&**m)) {
            return self.stash.remove(position);
        }

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match tokio::time::timeout_at(deadline, self.mailbox.recv()).await {
                Ok(Some(Delivery::Message(message))) => {
                    if pattern.matches(&*message) {
                        return Some(message);
                    }
                    self.stash.push_back(message);
                }
                Ok(Some(Delivery::Shutdown)) => continue,
                Ok(None) | Err(_) => return None,
            }
        }
    }
}

impl<P: Payload> Drop for Probe<P> {
    fn drop(&mut self) {
        if self.fabric.inner.post_office.remove(&self.address.id()).is_none() {
            warn!(probe = %self.address, "Probe mailbox already closed");
        }
    }
}
