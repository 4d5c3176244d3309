//! [`ActorEntity`] implementations for the three report records.
//!
//! Records are opened when their actor starts and closed when it ends; a closed record
//! refuses further changes.

use super::ReportError;
use crate::model::{
    OperationId, OperationReport, OperationReportCreate, OperationReportUpdate, ProcessId,
    ProcessOperation, ProcessReport, ProcessReportCreate, ProcessReportUpdate, VisitorOrder,
    VisitorOrderReport, VisitorReportId,
};
use agent_fabric::ActorEntity;
use async_trait::async_trait;

#[async_trait]
impl ActorEntity for OperationReport {
    type Id = OperationId;
    type Create = OperationReportCreate;
    type Update = OperationReportUpdate;
    type Action = ();
    type ActionResult = ();
    type Context = ();
    type Error = ReportError;

    fn from_create_params(id: OperationId, params: OperationReportCreate) -> Result<Self, Self::Error> {
        Ok(Self {
            id,
            process: params.process,
            card: params.card,
            started: None,
            ended: None,
            equipment: None,
            cook: None,
            active: false,
        })
    }

    /// `Started` records the reserved cook and equipment; `Ended` closes the record.
    async fn on_update(
        &mut self,
        update: OperationReportUpdate,
        _ctx: &(),
    ) -> Result<(), Self::Error> {
        if self.ended.is_some() {
            return Err(ReportError::AlreadyEnded(self.id.to_string()));
        }
        match update {
            OperationReportUpdate::Started { at, cook, equipment } => {
                self.started = Some(at);
                self.cook = Some(cook);
                self.equipment = equipment;
                self.active = true;
            }
            OperationReportUpdate::Ended { at } => {
                self.ended = Some(at);
                self.active = false;
            }
        }
        Ok(())
    }

    async fn handle_action(&mut self, _action: (), _ctx: &()) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[async_trait]
impl ActorEntity for ProcessReport {
    type Id = ProcessId;
    type Create = ProcessReportCreate;
    type Update = ProcessReportUpdate;
    type Action = ();
    type ActionResult = ();
    type Context = ();
    type Error = ReportError;

    fn from_create_params(id: ProcessId, params: ProcessReportCreate) -> Result<Self, Self::Error> {
        Ok(Self {
            id,
            ordered_dish: params.ordered_dish.id,
            started: Some(params.started),
            ended: None,
            active: true,
            operations: Vec::new(),
        })
    }

    async fn on_update(&mut self, update: ProcessReportUpdate, _ctx: &()) -> Result<(), Self::Error> {
        if self.ended.is_some() {
            return Err(ReportError::AlreadyEnded(self.id.to_string()));
        }
        match update {
            ProcessReportUpdate::AddOperation(operation) => {
                self.operations.push(ProcessOperation { operation });
            }
            ProcessReportUpdate::Ended { at } => {
                self.ended = Some(at);
                self.active = false;
            }
        }
        Ok(())
    }

    async fn handle_action(&mut self, _action: (), _ctx: &()) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Written once, when the visitor leaves; never updated.
#[async_trait]
impl ActorEntity for VisitorOrderReport {
    type Id = VisitorReportId;
    type Create = VisitorOrder;
    type Update = ();
    type Action = ();
    type ActionResult = ();
    type Context = ();
    type Error = ReportError;

    fn from_create_params(id: VisitorReportId, order: VisitorOrder) -> Result<Self, Self::Error> {
        Ok(Self { id, order })
    }

    async fn on_update(&mut self, _update: (), _ctx: &()) -> Result<(), Self::Error> {
        Err(ReportError::AlreadyEnded(self.id.to_string()))
    }

    async fn handle_action(&mut self, _action: (), _ctx: &()) -> Result<(), Self::Error> {
        Ok(())
    }
}
