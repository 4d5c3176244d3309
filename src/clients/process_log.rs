use crate::model::{
    timestamp, OperationId, OrderedDish, ProcessId, ProcessReport, ProcessReportCreate,
    ProcessReportUpdate,
};
use crate::report_actor::ReportError;
use agent_fabric::{ActorClient, FrameworkError, ResourceClient};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Client for the process log.
#[derive(Clone, Debug)]
pub struct ProcessLogClient {
    inner: ResourceClient<ProcessReport>,
}

impl ProcessLogClient {
    pub fn new(inner: ResourceClient<ProcessReport>) -> Self {
        Self { inner }
    }

    /// Opens a record stamped with the current time; its id numbers the process.
    #[instrument(skip(self))]
    pub async fn open(&self, ordered_dish: OrderedDish) -> Result<ProcessId, ReportError> {
        debug!("Sending request");
        let draft = ProcessReportCreate {
            ordered_dish,
            started: timestamp::now(),
        };
        self.inner.create(draft).await.map_err(Self::map_error)
    }

    #[instrument(skip(self))]
    pub async fn add_operation(
        &self,
        id: ProcessId,
        operation: OperationId,
    ) -> Result<(), ReportError> {
        debug!("Sending request");
        self.inner
            .update(id, ProcessReportUpdate::AddOperation(operation))
            .await
            .map(|_| ())
            .map_err(Self::map_error)
    }

    #[instrument(skip(self))]
    pub async fn ended(&self, id: ProcessId) -> Result<(), ReportError> {
        debug!("Sending request");
        self.inner
            .update(id, ProcessReportUpdate::Ended { at: timestamp::now() })
            .await
            .map(|_| ())
            .map_err(Self::map_error)
    }
}

#[async_trait]
impl ActorClient<ProcessReport> for ProcessLogClient {
    type Error = ReportError;

    fn inner(&self) -> &ResourceClient<ProcessReport> {
        &self.inner
    }

    fn map_error(e: FrameworkError) -> Self::Error {
        match e {
            FrameworkError::NotFound(id) => ReportError::NotFound(id),
            other => ReportError::ActorCommunicationError(other.to_string()),
        }
    }
}
