//! # Agent Fabric
//!
//! Building blocks for simulations made of many small, concurrent agents that coordinate
//! only by exchanging messages. Two kinds of actors live side by side:
//!
//! - **Agents** ([`Agent`]) are message-driven state machines. Each owns a mailbox and, in
//!   every state, declares the [`Pattern`] of messages it is ready for. Whatever does not
//!   match stays queued. Agents find each other through the [`directory`] and talk with
//!   speech-act [`Message`]s (request, inform, propose, accept, ...).
//! - **Ledgers** ([`ResourceActor`]) are request/response actors that own a collection of
//!   records ([`ActorEntity`]) behind a typed [`ResourceClient`]. They are the right tool for
//!   anything append-mostly and shared, such as reports and sequence counters.
//!
//! ## Architecture Overview
//!
//! 1. **Messages** ([`acl`], [`pattern`]) - envelopes, performatives, selectors
//! 2. **Runtime** ([`fabric`], [`agent`], [`context`]) - addresses, mailboxes, timers, spawn and shutdown
//! 3. **Discovery** ([`directory`]) - capability registration and attribute lookup
//! 4. **Ledgers** ([`actor`], [`client`], [`client_trait`], [`entity`]) - CRUD actors and their clients
//!
//! ## Concurrency Model
//!
//! - Each agent and each ledger runs in its own Tokio task
//! - An agent handles one message or timer at a time; its state needs no locks
//! - Handlers never wait on other agents: every exchange is a message and a later reply
//! - Timers belong to the agent's own loop, so a cancelled timer cannot fire late
//!
//! ## Testing
//!
//! - [`Probe`] is a mailbox without an agent: tests use it to play the other side of a
//!   conversation.
//! - [`mock::MockClient`] scripts a ledger's answers for code that writes reports.
//!
//! **Further Reading**:
//! - [Actors with Tokio](https://ryhl.io/blog/actors-with-tokio/)
//! - [FIPA ACL Message Structure](http://www.fipa.org/specs/fipa00061/)

pub mod acl;
pub mod actor;
pub mod address;
pub mod agent;
pub mod client;
pub mod client_trait;
pub mod context;
pub mod directory;
pub mod entity;
pub mod error;
pub mod fabric;
pub mod message;
pub mod mock;
pub mod pattern;

pub use acl::{Message, Payload, Performative};
pub use actor::ResourceActor;
pub use address::ActorAddress;
pub use agent::{Agent, Flow};
pub use client::ResourceClient;
pub use client_trait::ActorClient;
pub use context::AgentContext;
pub use directory::{DirectoryActor, DirectoryClient, ServiceDescription};
pub use entity::ActorEntity;
pub use error::FrameworkError;
pub use fabric::{Fabric, FabricSettings, Probe};
pub use message::{ResourceRequest, Response};
pub use pattern::Pattern;
