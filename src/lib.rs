#![doc(html_logo_url = "https://www.rust-lang.org/logos/rust-logo-128x128.png")]
#![doc(html_favicon_url = "https://www.rust-lang.org/favicon.ico")]
//! # Kitchen Sim
//!
//! > **A restaurant kitchen run by agents.**
//!
//! Visitors order dishes, a supervisor decides what to cook next, and every ordered dish
//! becomes a small chain of agents (dish, process, operation) that negotiates for cooks and
//! equipment, takes products from the warehouse and works through its recipe card. Nothing
//! is shared between agents except messages; the only shared state is owned by exactly one
//! agent (stock by the warehouse, a reservation by its cook or unit, the kitchen snapshot
//! by the menu).
//!
//! ## 🏗️ Design Philosophy
//!
//! Two kinds of actors from [`agent_fabric`] work together:
//! - **Agents** for everything that negotiates or waits: message-driven state machines that
//!   pick the messages they are ready for with a [`Pattern`](agent_fabric::Pattern).
//! - **Ledgers** for everything that is only recorded: the operation, process and visitor
//!   reports are [`ResourceActor`](agent_fabric::ResourceActor)s behind typed
//!   [`clients`], and their sequence counters number processes and operations.
//!
//! ## 🍳 Cooking a Dish
//!
//! ```text
//! Visitor --order--> Supervisor --menu?--> Menu
//!                        |
//!                        +--spawns--> Order + Dish per item
//!
//! Supervisor --start--> Dish --> Process --> Operation 1 --> Operation 2 --> ...
//!                                              |   reserve products (Warehouse)
//!                                              |   negotiate equipment, then a cook
//!                                              |   work for the operation's duration
//!
//! Operation --done--> Process --done--> Dish --done--> Order --done--> Visitor
//! Visitor --cancel--> Order --> Dish --> Process --> live Operation (releases everything)
//! ```
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Domain ([`model`], [`data`], [`config`])
//! Catalog, orders, outcomes and report records; the JSON input bundle; the options file.
//!
//! ### 2. The Conversation ([`protocol`], [`kitchen`])
//! Every payload, conversation tag and directory capability; the shared environment each
//! agent is built with and the timer-driven directory lookups.
//!
//! ### 3. The Reasoning ([`time_model`], [`menu_actor::actualize`], [`supervisor_actor::plan`])
//! Pure functions: completion and idle time projections, menu exclusion rules, and the
//! activation plan of a scheduling cycle.
//!
//! ### 4. The Agents (`*_actor`)
//! [`resource_actor`], [`warehouse_actor`], [`menu_actor`], [`supervisor_actor`],
//! [`order_actor`], [`dish_actor`], [`process_actor`], [`operation_actor`],
//! [`visitor_actor`], [`simulation_actor`].
//!
//! ### 5. The Records ([`report_actor`], [`clients`], [`output`])
//! Report ledgers, their typed clients, and the JSON sink they are drained into.
//!
//! ### 6. The Orchestrator ([`lifecycle`])
//! [`Restaurant`](lifecycle::Restaurant) starts a run, waits for the last visitor, and
//! shuts everything down.
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! RUST_LOG=info cargo run -- --input data --output out
//! cargo test
//! ```

pub mod clients;
pub mod config;
pub mod console;
pub mod data;
pub mod dish_actor;
pub mod error;
pub mod kitchen;
pub mod lifecycle;
pub mod menu_actor;
pub mod model;
pub mod operation_actor;
pub mod order_actor;
pub mod output;
pub mod process_actor;
pub mod protocol;
pub mod report_actor;
pub mod resource_actor;
pub mod simulation_actor;
pub mod supervisor_actor;
pub mod time_model;
pub mod visitor_actor;
pub mod warehouse_actor;
