//! Typed wrappers around the report ledgers' [`ResourceClient`](agent_fabric::ResourceClient)s.

pub mod operation_log;
pub mod process_log;
pub mod visitor_log;

pub use operation_log::*;
pub use process_log::*;
pub use visitor_log::*;

/// The three report clients, handed to every agent that writes a report.
#[derive(Clone, Debug)]
pub struct ReportClients {
    pub operations: OperationLogClient,
    pub processes: ProcessLogClient,
    pub visitors: VisitorLogClient,
}
