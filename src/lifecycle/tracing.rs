//! # Observability & Tracing
//!
//! [`setup_tracing`] installs the subscriber used by the `kitchen-sim` binary.
//!
//! What gets traced:
//! - agent lifecycle (`Agent started`, `Agent stopped`, `Agent failed`) with the agent address
//! - ledger lifecycle and CRUD (`Actor started`, `Created`, `Shutdown`) with `entity_type`
//! - negotiation, cooking and order progress at `info`, payload detail at `debug`
//! - deferred messages, fired timers and sends at `trace`
//! - the fabric halting, with its reason
//!
//! ```bash
//! RUST_LOG=info cargo run       # progress only
//! RUST_LOG=debug cargo run      # payload detail and directory traffic
//! RUST_LOG=agent_fabric=trace cargo run
//! ```

/// Compact, env-filtered subscriber; module paths are hidden since every line carries an
/// agent address or an `entity_type`.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
