//! # Agents
//!
//! An [`Agent`] is a message-driven state machine. Where a [`ResourceActor`](crate::ResourceActor)
//! answers a fixed CRUD protocol, an agent decides for itself which messages it accepts: in
//! every state it exposes a [`Pattern`], and the runtime hands it the oldest queued message
//! matching that pattern. Messages that do not match stay in the mailbox, in order, until a
//! later state wants them.
//!
//! The run loop below is the only place an agent ever waits. It suspends on the mailbox or on
//! the earliest timer registered through the [`AgentContext`], never inside a handler.
//!
//! ```rust
//! use agent_fabric::{Agent, AgentContext, DirectoryActor, Fabric, FabricSettings, Flow,
//!     Message, Pattern, Payload, Performative};
//! use async_trait::async_trait;
//! use std::time::Duration;
//!
//! #[derive(Debug, Clone)]
//! enum Bell { Ring }
//! impl Payload for Bell { fn kind(&self) -> &'static str { "ring" } }
//!
//! struct Doorman;
//!
//! #[async_trait]
//! impl Agent for Doorman {
//!     type Payload = Bell;
//!     type Timer = ();
//!     type Error = std::convert::Infallible;
//!
//!     fn name(&self) -> String { "doorman".into() }
//!     fn pattern(&self) -> Pattern { Pattern::kind("ring") }
//!
//!     async fn on_message(
//!         &mut self,
//!         message: &Message<Bell>,
//!         ctx: &mut AgentContext<Bell, ()>,
//!     ) -> Result<Flow, Self::Error> {
//!         ctx.send(message.reply(Performative::Inform, Bell::Ring));
//!         Ok(Flow::Stop)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let (directory, client) = DirectoryActor::new(16);
//!     tokio::spawn(directory.run());
//!     let fabric = Fabric::new(client, FabricSettings::default());
//!
//!     let doorman = fabric.spawn(Doorman);
//!     let mut probe = fabric.probe("visitor");
//!     probe.send(Message::new(Performative::Request, "door", Bell::Ring).to(doorman));
//!
//!     let answer = probe.receive(&Pattern::any(), Duration::from_secs(1)).await;
//!     assert!(answer.is_some());
//!     fabric.shutdown().await;
//! }
//! ```

use crate::acl::{Message, Payload};
use crate::context::AgentContext;
use crate::directory::ServiceDescription;
use crate::fabric::Delivery;
use crate::pattern::Pattern;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{error, info, trace};

/// What the run loop does after a handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Contract for message-driven agents run by the [`Fabric`](crate::Fabric).
///
/// Returning `Err` from any hook is a fatal fault: the agent stops and the fabric is halted
/// with the error text. Recoverable situations belong in the agent's own messages.
#[async_trait]
pub trait Agent: Send + 'static {
    /// The message payload shared by every agent on the same fabric.
    type Payload: Payload;

    /// Keys of the timers this agent schedules.
    type Timer: Debug + Send + Sync + 'static;

    type Error: std::error::Error + Send + Sync + 'static;

    /// Human-readable name, used in the agent's address and in logs.
    fn name(&self) -> String;

    /// Services published in the directory before `on_start` runs; withdrawn on stop.
    fn services(&self) -> Vec<ServiceDescription> {
        Vec::new()
    }

    async fn on_start(
        &mut self,
        _ctx: &mut AgentContext<Self::Payload, Self::Timer>,
    ) -> Result<Flow, Self::Error> {
        Ok(Flow::Continue)
    }

    /// Messages accepted in the current state.
    fn pattern(&self) -> Pattern;

    async fn on_message(
        &mut self,
        message: &Message<Self::Payload>,
        ctx: &mut AgentContext<Self::Payload, Self::Timer>,
    ) -> Result<Flow, Self::Error>;

    async fn on_timer(
        &mut self,
        _timer: Self::Timer,
        _ctx: &mut AgentContext<Self::Payload, Self::Timer>,
    ) -> Result<Flow, Self::Error> {
        Ok(Flow::Continue)
    }

    /// Called once when the loop ends, whatever the reason.
    async fn on_stop(&mut self, _ctx: &mut AgentContext<Self::Payload, Self::Timer>) {}
}

type Mailbox<P> = mpsc::UnboundedReceiver<Delivery<P>>;

/// Runs `agent` until it stops, is shut down, or fails.
pub(crate) async fn run_agent<A: Agent>(
    mut agent: A,
    mut mailbox: Mailbox<A::Payload>,
    mut ctx: AgentContext<A::Payload, A::Timer>,
) {
    let address = ctx.address().clone();
    info!(agent = %address, "Agent started");

    let mut stash = VecDeque::new();
    if let Err(reason) = drive(&mut agent, &mut mailbox, &mut stash, &mut ctx).await {
        error!(agent = %address, %reason, "Agent failed");
        ctx.fabric().halt(format!("{address}: {reason}"));
    }

    agent.on_stop(&mut ctx).await;
    ctx.fabric().retire(&address).await;
    info!(agent = %address, unread = stash.len(), "Agent stopped");
}

async fn drive<A: Agent>(
    agent: &mut A,
    mailbox: &mut Mailbox<A::Payload>,
    stash: &mut VecDeque<Arc<Message<A::Payload>>>,
    ctx: &mut AgentContext<A::Payload, A::Timer>,
) -> Result<(), String> {
    let settings = ctx.fabric().settings().clone();
    for service in agent.services() {
        ctx.fabric()
            .directory()
            .register_with_retry(
                ctx.address(),
                &service,
                settings.registration_attempts,
                settings.retry_delay,
            )
            .await
            .map_err(|e| e.to_string())?;
    }

    if agent.on_start(ctx).await.map_err(|e| e.to_string())? == Flow::Stop {
        return Ok(());
    }

    loop {
        let pattern = agent.pattern();

        if let Some(position) = stash.iter().position(|m| pattern.matches(&**m)) {
            if let Some(message) = stash.remove(position) {
                if agent
                    .on_message(&message, ctx)
                    .await
                    .map_err(|e| e.to_string())?
                    == Flow::Stop
                {
                    return Ok(());
                }
            }
            continue;
        }

        let deadline = ctx.next_deadline();
        tokio::select! {
            delivery = mailbox.recv() => match delivery {
                Some(Delivery::Message(message)) => {
                    if pattern.matches(&*message) {
                        if agent.on_message(&message, ctx).await.map_err(|e| e.to_string())? == Flow::Stop {
                            return Ok(());
                        }
                    } else {
                        trace!(
                            agent = %ctx.address(),
                            performative = %message.performative(),
                            conversation = message.conversation(),
                            "Deferred"
                        );
                        stash.push_back(message);
                    }
                }
                Some(Delivery::Shutdown) | None => return Ok(()),
            },
            () = sleep_until(deadline) => {
                if let Some(timer) = ctx.take_due(Instant::now()) {
                    trace!(agent = %ctx.address(), ?timer, "Timer fired");
                    if agent.on_timer(timer, ctx).await.map_err(|e| e.to_string())? == Flow::Stop {
                        return Ok(());
                    }
                }
            }
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
