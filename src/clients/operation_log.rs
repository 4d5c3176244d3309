use crate::model::{
    timestamp, CardId, CookId, EquipmentId, OperationId, OperationReport, OperationReportCreate,
    OperationReportUpdate, ProcessId,
};
use crate::report_actor::ReportError;
use agent_fabric::{ActorClient, FrameworkError, ResourceClient};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Client for the operation log.
#[derive(Clone, Debug)]
pub struct OperationLogClient {
    inner: ResourceClient<OperationReport>,
}

impl OperationLogClient {
    pub fn new(inner: ResourceClient<OperationReport>) -> Self {
        Self { inner }
    }

    /// Opens a record and returns the new operation's id.
    #[instrument(skip(self))]
    pub async fn open(&self, process: ProcessId, card: CardId) -> Result<OperationId, ReportError> {
        debug!("Sending request");
        self.inner
            .create(OperationReportCreate { process, card })
            .await
            .map_err(Self::map_error)
    }

    #[instrument(skip(self))]
    pub async fn started(
        &self,
        id: OperationId,
        cook: CookId,
        equipment: Option<EquipmentId>,
    ) -> Result<(), ReportError> {
        debug!("Sending request");
        let update = OperationReportUpdate::Started {
            at: timestamp::now(),
            cook,
            equipment,
        };
        self.inner
            .update(id, update)
            .await
            .map(|_| ())
            .map_err(Self::map_error)
    }

    #[instrument(skip(self))]
    pub async fn ended(&self, id: OperationId) -> Result<(), ReportError> {
        debug!("Sending request");
        self.inner
            .update(id, OperationReportUpdate::Ended { at: timestamp::now() })
            .await
            .map(|_| ())
            .map_err(Self::map_error)
    }
}

#[async_trait]
impl ActorClient<OperationReport> for OperationLogClient {
    type Error = ReportError;

    fn inner(&self) -> &ResourceClient<OperationReport> {
        &self.inner
    }

    fn map_error(e: FrameworkError) -> Self::Error {
        match e {
            FrameworkError::NotFound(id) => ReportError::NotFound(id),
            other => ReportError::ActorCommunicationError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_fabric::mock::MockClient;

    #[tokio::test]
    async fn test_open_returns_ledger_id() {
        let mut mock = MockClient::<OperationReport>::new();
        mock.expect_create().return_ok(OperationId(12));

        let client = OperationLogClient::new(mock.client());
        let id = client.open(ProcessId(3), CardId(7)).await;

        assert_eq!(id, Ok(OperationId(12)));
        mock.verify();
    }

    #[tokio::test]
    async fn test_missing_record_maps_to_not_found() {
        let mut mock = MockClient::<OperationReport>::new();
        mock.expect_update()
            .return_err(FrameworkError::NotFound("operation_4".into()));

        let client = OperationLogClient::new(mock.client());
        let result = client.ended(OperationId(4)).await;

        assert_eq!(result, Err(ReportError::NotFound("operation_4".into())));
        assert_eq!(mock.received(), vec!["update"]);
    }

    #[tokio::test]
    async fn test_closed_ledger_is_a_communication_error() {
        let mut mock = MockClient::<OperationReport>::new();
        mock.expect_list().return_err(FrameworkError::ActorClosed);

        let client = OperationLogClient::new(mock.client());
        assert!(matches!(
            client.list().await,
            Err(ReportError::ActorCommunicationError(_))
        ));
    }
}
