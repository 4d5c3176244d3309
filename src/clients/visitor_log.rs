use crate::model::{VisitorOrder, VisitorOrderReport, VisitorReportId};
use crate::report_actor::ReportError;
use agent_fabric::{ActorClient, FrameworkError, ResourceClient};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Client for the visitor order log.
#[derive(Clone, Debug)]
pub struct VisitorLogClient {
    inner: ResourceClient<VisitorOrderReport>,
}

impl VisitorLogClient {
    pub fn new(inner: ResourceClient<VisitorOrderReport>) -> Self {
        Self { inner }
    }

    #[instrument(skip(self, order), fields(visitor = %order.visitor_name))]
    pub async fn write(&self, order: VisitorOrder) -> Result<VisitorReportId, ReportError> {
        debug!("Sending request");
        self.inner.create(order).await.map_err(Self::map_error)
    }
}

#[async_trait]
impl ActorClient<VisitorOrderReport> for VisitorLogClient {
    type Error = ReportError;

    fn inner(&self) -> &ResourceClient<VisitorOrderReport> {
        &self.inner
    }

    fn map_error(e: FrameworkError) -> Self::Error {
        ReportError::ActorCommunicationError(e.to_string())
    }
}
