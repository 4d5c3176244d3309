//! # Report Output
//!
//! At the end of a run the three ledgers are drained into a [`RunReport`] and handed to a
//! [`ReportSink`]. [`JsonReportSink`] writes one file per report type, each an object with
//! a single array named after the file, records ordered by start time:
//!
//! ```json
//! { "operation_log": [ { "oper_id": 1, "oper_proc": 1, "oper_card": 10, ... } ] }
//! ```

use crate::model::{OperationReport, ProcessReport, VisitorOrderReport};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum OutputError {
    #[error("Cannot write {file}: {message}")]
    Io { file: String, message: String },

    #[error("Cannot encode {file}: {message}")]
    Encode { file: String, message: String },
}

/// Everything the kitchen recorded during one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub operations: Vec<OperationReport>,
    pub processes: Vec<ProcessReport>,
    pub visitors: Vec<VisitorOrderReport>,
}

impl RunReport {
    /// Orders every log by start time; records that never started go last.
    pub fn sort(&mut self) {
        self.operations.sort_by_key(|r| (r.started.is_none(), r.started, r.id));
        self.processes.sort_by_key(|r| (r.started.is_none(), r.started, r.id));
        self.visitors
            .sort_by_key(|r| (r.order.started.is_none(), r.order.started, r.id.0));
    }
}

/// Where a finished run's reports go.
pub trait ReportSink {
    fn write(&self, report: &RunReport) -> Result<(), OutputError>;
}

/// Writes `operation_log.json`, `process_log.json` and `visitor_order_log.json` into a
/// directory.
#[derive(Debug, Clone)]
pub struct JsonReportSink {
    dir: PathBuf,
}

impl JsonReportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ReportSink for JsonReportSink {
    fn write(&self, report: &RunReport) -> Result<(), OutputError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| OutputError::Io {
            file: self.dir.display().to_string(),
            message: e.to_string(),
        })?;
        write_list(&self.dir, "operation_log", &report.operations)?;
        write_list(&self.dir, "process_log", &report.processes)?;
        write_list(&self.dir, "visitor_order_log", &report.visitors)?;
        info!(
            dir = %self.dir.display(),
            operations = report.operations.len(),
            processes = report.processes.len(),
            visitors = report.visitors.len(),
            "Reports written"
        );
        Ok(())
    }
}

fn write_list<T: Serialize>(dir: &Path, key: &str, records: &[T]) -> Result<(), OutputError> {
    let file = format!("{key}.json");
    let encode = |e: serde_json::Error| OutputError::Encode {
        file: file.clone(),
        message: e.to_string(),
    };
    let mut body = serde_json::Map::new();
    body.insert(key.to_string(), serde_json::to_value(records).map_err(encode)?);
    let text = serde_json::to_string_pretty(&body).map_err(encode)?;
    std::fs::write(dir.join(&file), text).map_err(|e| OutputError::Io {
        file,
        message: e.to_string(),
    })
}
