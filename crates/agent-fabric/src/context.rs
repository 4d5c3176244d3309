//! # Agent Context
//!
//! Everything an agent may do besides changing its own state goes through its
//! [`AgentContext`]: sending messages, spawning children, asking the directory, and
//! scheduling timers.
//!
//! Timers live in the context rather than in free-running tasks. The run loop only ever
//! sleeps until the earliest deadline registered here, so cancelling a timer simply removes
//! it: a cancelled timer can never fire afterwards, and a timer can never race a message the
//! agent is already handling.

use crate::acl::{Message, Payload};
use crate::address::ActorAddress;
use crate::agent::Agent;
use crate::directory::ServiceDescription;
use crate::error::FrameworkError;
use crate::fabric::Fabric;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

#[derive(Debug)]
struct ScheduledTimer<T> {
    deadline: Instant,
    seq: u64,
    key: T,
}

/// Per-agent handle to the fabric plus the agent's pending timers.
pub struct AgentContext<P: Payload, T> {
    address: ActorAddress,
    fabric: Fabric<P>,
    timers: Vec<ScheduledTimer<T>>,
    next_seq: u64,
}

impl<P: Payload, T: Send + 'static> AgentContext<P, T> {
    pub(crate) fn new(address: ActorAddress, fabric: Fabric<P>) -> Self {
        Self {
            address,
            fabric,
            timers: Vec::new(),
            next_seq: 0,
        }
    }

    /// This agent's own address.
    pub fn address(&self) -> &ActorAddress {
        &self.address
    }

    pub fn fabric(&self) -> &Fabric<P> {
        &self.fabric
    }

    /// Sends `message` from this agent; returns how many receivers it reached.
    pub fn send(&self, message: Message<P>) -> usize {
        trace!(
            from = %self.address,
            performative = %message.performative(),
            conversation = message.conversation(),
            kind = message.kind(),
            "Send"
        );
        self.fabric.deliver(message.stamp(self.address.clone()))
    }

    /// Spawns a child agent on the same fabric.
    pub fn spawn<A>(&self, agent: A) -> ActorAddress
    where
        A: Agent<Payload = P>,
    {
        self.fabric.spawn(agent)
    }

    /// Directory lookup; an empty list means "not registered yet", not failure.
    pub async fn lookup(
        &self,
        filter: ServiceDescription,
    ) -> Result<Vec<ActorAddress>, FrameworkError> {
        let settings = self.fabric.settings();
        self.fabric
            .directory()
            .lookup_with_retry(&filter, settings.registration_attempts, settings.retry_delay)
            .await
    }

    /// Fresh identifier for correlating a request with its replies.
    pub fn new_correlation(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Fires `key` once after `delay`. Timers with equal deadlines fire in scheduling order.
    pub fn schedule(&mut self, delay: Duration, key: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.timers.push(ScheduledTimer {
            deadline: Instant::now() + delay,
            seq,
            key,
        });
    }

    /// Cancels every pending timer equal to `key`; returns whether any was pending.
    pub fn cancel_timer(&mut self, key: &T) -> bool
    where
        T: PartialEq,
    {
        let before = self.timers.len();
        self.timers.retain(|t| &t.key != key);
        before != self.timers.len()
    }

    pub fn has_timer(&self, key: &T) -> bool
    where
        T: PartialEq,
    {
        self.timers.iter().any(|t| &t.key == key)
    }

    /// Time left until `key` fires, if it is pending.
    pub fn time_until(&self, key: &T) -> Option<Duration>
    where
        T: PartialEq,
    {
        let now = Instant::now();
        self.timers
            .iter()
            .filter(|t| &t.key == key)
            .map(|t| t.deadline.saturating_duration_since(now))
            .min()
    }

    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.timers.iter().map(|t| t.deadline).min()
    }

    pub(crate) fn take_due(&mut self, now: Instant) -> Option<T> {
        let position = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.deadline <= now)
            .min_by_key(|(_, t)| (t.deadline, t.seq))
            .map(|(i, _)| i)?;
        Some(self.timers.swap_remove(position).key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::DirectoryActor;
    use crate::fabric::FabricSettings;

    #[derive(Debug, Clone)]
    struct Noop;

    impl Payload for Noop {
        fn kind(&self) -> &'static str {
            "noop"
        }
    }

    fn context() -> AgentContext<Noop, &'static str> {
        let (_directory, client) = DirectoryActor::new(1);
        let fabric = Fabric::new(client, FabricSettings::default());
        AgentContext::new(ActorAddress::new(1, "timekeeper"), fabric)
    }

    #[tokio::test(start_paused = true)]
    async fn test_timers_fire_in_deadline_order() {
        let mut ctx = context();
        ctx.schedule(Duration::from_millis(30), "late");
        ctx.schedule(Duration::from_millis(10), "early");
        ctx.schedule(Duration::from_millis(10), "early-second");

        assert_eq!(ctx.take_due(Instant::now()), None);

        tokio::time::advance(Duration::from_millis(15)).await;
        assert_eq!(ctx.take_due(Instant::now()), Some("early"));
        assert_eq!(ctx.take_due(Instant::now()), Some("early-second"));
        assert_eq!(ctx.take_due(Instant::now()), None);

        tokio::time::advance(Duration::from_millis(20)).await;
        assert_eq!(ctx.take_due(Instant::now()), Some("late"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_fires() {
        let mut ctx = context();
        ctx.schedule(Duration::from_millis(5), "reservation");
        assert!(ctx.has_timer(&"reservation"));
        assert!(ctx.cancel_timer(&"reservation"));
        assert!(!ctx.cancel_timer(&"reservation"));

        tokio::time::advance(Duration::from_millis(10)).await;
        assert_eq!(ctx.take_due(Instant::now()), None);
        assert_eq!(ctx.next_deadline(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_until_reports_remaining() {
        let mut ctx = context();
        ctx.schedule(Duration::from_millis(100), "cook");
        tokio::time::advance(Duration::from_millis(40)).await;
        assert_eq!(ctx.time_until(&"cook"), Some(Duration::from_millis(60)));
        assert_eq!(ctx.time_until(&"oven"), None);
    }
}
