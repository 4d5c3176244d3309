/// Report records written while the simulation runs.
///
/// # Actor Framework
/// Each record type implements [`ActorEntity`](agent_fabric::ActorEntity) (see
/// [`report_actor`](crate::report_actor)) and lives in its own ledger. The ledger's sequence
/// counter hands out the record id, which doubles as the process / operation number.
use crate::model::catalog::{CardId, CookId, EquipmentId};
use crate::model::order::{OrderedDish, VisitorOrder};
use crate::model::timestamp;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Type-safe identifier for cooking processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(pub u32);

impl From<u32> for ProcessId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "process_{}", self.0)
    }
}

/// Type-safe identifier for executed operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(pub u32);

impl From<u32> for OperationId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "operation_{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitorReportId(pub u32);

impl From<u32> for VisitorReportId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl Display for VisitorReportId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "visitor_order_{}", self.0)
    }
}

// --- Operation log ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationReport {
    #[serde(rename = "oper_id")]
    pub id: OperationId,
    #[serde(rename = "oper_proc")]
    pub process: ProcessId,
    #[serde(rename = "oper_card")]
    pub card: CardId,
    #[serde(rename = "oper_started", with = "timestamp::optional")]
    pub started: Option<NaiveDateTime>,
    #[serde(rename = "oper_ended", with = "timestamp::optional")]
    pub ended: Option<NaiveDateTime>,
    #[serde(rename = "oper_equip_id")]
    pub equipment: Option<EquipmentId>,
    #[serde(rename = "oper_cook_id")]
    pub cook: Option<CookId>,
    #[serde(rename = "oper_active")]
    pub active: bool,
}

/// Payload for opening an operation record.
#[derive(Debug, Clone)]
pub struct OperationReportCreate {
    pub process: ProcessId,
    pub card: CardId,
}

#[derive(Debug, Clone)]
pub enum OperationReportUpdate {
    /// Cook (and equipment, if any) reserved; execution begins.
    Started {
        at: NaiveDateTime,
        cook: CookId,
        equipment: Option<EquipmentId>,
    },
    /// Execution finished or was interrupted.
    Ended { at: NaiveDateTime },
}

// --- Process log ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessOperation {
    #[serde(rename = "proc_oper")]
    pub operation: OperationId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessReport {
    #[serde(rename = "proc_id")]
    pub id: ProcessId,
    #[serde(rename = "ord_dish")]
    pub ordered_dish: u32,
    #[serde(rename = "proc_started", with = "timestamp::optional")]
    pub started: Option<NaiveDateTime>,
    #[serde(rename = "proc_ended", with = "timestamp::optional")]
    pub ended: Option<NaiveDateTime>,
    #[serde(rename = "proc_active")]
    pub active: bool,
    #[serde(rename = "proc_operations")]
    pub operations: Vec<ProcessOperation>,
}

#[derive(Debug, Clone)]
pub struct ProcessReportCreate {
    pub ordered_dish: OrderedDish,
    pub started: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub enum ProcessReportUpdate {
    AddOperation(OperationId),
    Ended { at: NaiveDateTime },
}

// --- Visitor order log ---

/// The visitor's order as it finally went: written once, when the visitor leaves.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitorOrderReport {
    #[serde(skip)]
    pub id: VisitorReportId,
    #[serde(flatten)]
    pub order: VisitorOrder,
}
