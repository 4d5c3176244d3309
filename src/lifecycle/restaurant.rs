//! # Run Lifecycle
//!
//! The [`Restaurant`] is the conductor of one simulation run. Agents are simple on their
//! own; wiring them is where the care goes:
//!
//! 1. **Infrastructure**: the directory and the three report ledgers start first, each in
//!    its own task, because every agent depends on them.
//! 2. **Fabric**: agents share one [`Fabric`] built with the configured retry policy.
//! 3. **Simulation**: a single [`SimulationAgent`] brings the kitchen up (resources,
//!    warehouse, menu, supervisor) and lets the visitors in. It reports back to a driver
//!    [`Probe`] owned by the `Restaurant`.
//! 4. **Shutdown**: once the last visitor has left, or any agent has failed, every agent is
//!    stopped, the ledgers are drained into a [`RunReport`], and the infrastructure tasks
//!    are awaited.
//!
//! ```rust,ignore
//! let report = Restaurant::start(config, data, Console::new(false)).run().await?;
//! JsonReportSink::new("output").write(&report)?;
//! ```

use crate::clients::ReportClients;
use crate::config::SimulationConfig;
use crate::console::Console;
use crate::data::KitchenData;
use crate::kitchen::Kitchen;
use crate::output::RunReport;
use crate::protocol::{conversation, KitchenPayload};
use crate::report_actor::{self, ReportError};
use crate::simulation_actor::SimulationAgent;
use agent_fabric::{ActorClient, DirectoryActor, Fabric, Pattern, Probe};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SimulationError {
    /// An agent failed; the fabric was halted with this diagnostic.
    #[error("Simulation halted: {0}")]
    Halted(String),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Task failed: {0}")]
    TaskFailed(String),
}

/// One running simulation.
pub struct Restaurant {
    fabric: Fabric<KitchenPayload>,
    driver: Probe<KitchenPayload>,
    reports: ReportClients,
    handles: Vec<JoinHandle<()>>,
}

impl Restaurant {
    /// Starts the infrastructure and the simulation agent. Must be called from within a
    /// Tokio runtime.
    pub fn start(config: SimulationConfig, data: KitchenData, console: Console) -> Self {
        let (directory, directory_client) = DirectoryActor::new(256);
        let (operation_log, operations) = report_actor::new_operation_log();
        let (process_log, processes) = report_actor::new_process_log();
        let (visitor_log, visitors) = report_actor::new_visitor_log();
        let handles = vec![
            tokio::spawn(directory.run()),
            tokio::spawn(operation_log.run(())),
            tokio::spawn(process_log.run(())),
            tokio::spawn(visitor_log.run(())),
        ];

        let fabric = Fabric::new(directory_client, config.fabric_settings());
        let reports = ReportClients {
            operations,
            processes,
            visitors,
        };
        let kitchen = Kitchen {
            config: Arc::new(config),
            data: Arc::new(data),
            reports: reports.clone(),
            console,
        };

        let driver = fabric.probe("driver");
        fabric.spawn(SimulationAgent::new(kitchen, driver.address().clone()));
        info!("Restaurant open");

        Self {
            fabric,
            driver,
            reports,
            handles,
        }
    }

    /// Runs until every visitor has left, then shuts down and returns the reports.
    pub async fn run(self) -> Result<RunReport, SimulationError> {
        let Self {
            fabric,
            mut driver,
            reports,
            handles,
        } = self;

        let outcome = tokio::select! {
            visitors = wait_for_last_visitor(&mut driver) => {
                info!(visitors, "Simulation finished");
                Ok(())
            }
            reason = fabric.halted() => Err(SimulationError::Halted(reason)),
        };

        fabric.shutdown().await;
        drop(driver);
        drop(fabric);

        let report = collect(&reports).await;
        drop(reports);
        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Infrastructure task failed");
                return Err(SimulationError::TaskFailed(e.to_string()));
            }
        }
        info!("Restaurant closed");

        outcome?;
        report
    }
}

async fn wait_for_last_visitor(driver: &mut Probe<KitchenPayload>) -> usize {
    let finished =
        Pattern::conversation(conversation::SIMULATION).and(Pattern::kind("simulation-finished"));
    loop {
        if let Some(message) = driver.receive(&finished, Duration::from_secs(60)).await {
            if let KitchenPayload::SimulationFinished { visitors } = message.payload() {
                return *visitors;
            }
        }
    }
}

/// Drains the three ledgers, ordered by start time.
async fn collect(reports: &ReportClients) -> Result<RunReport, SimulationError> {
    let mut report = RunReport {
        operations: reports.operations.list().await?,
        processes: reports.processes.list().await?,
        visitors: reports.visitors.list().await?,
    };
    report.sort();
    Ok(report)
}
