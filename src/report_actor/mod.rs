//! Report ledgers: one [`ResourceActor`] per report type.
//!
//! The ledger's own sequence counter numbers the records, so process and operation ids are
//! unique for the whole run without any shared counter.

pub mod entity;
pub mod error;

pub use error::*;

use crate::clients::{OperationLogClient, ProcessLogClient, VisitorLogClient};
use agent_fabric::ResourceActor;
use crate::model::{OperationReport, ProcessReport, VisitorOrderReport};

/// Creates the operation log and its client.
pub fn new_operation_log() -> (ResourceActor<OperationReport>, OperationLogClient) {
    let (actor, client) = ResourceActor::new(64);
    (actor, OperationLogClient::new(client))
}

pub fn new_process_log() -> (ResourceActor<ProcessReport>, ProcessLogClient) {
    let (actor, client) = ResourceActor::new(64);
    (actor, ProcessLogClient::new(client))
}

pub fn new_visitor_log() -> (ResourceActor<VisitorOrderReport>, VisitorLogClient) {
    let (actor, client) = ResourceActor::new(32);
    (actor, VisitorLogClient::new(client))
}
