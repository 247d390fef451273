//! Runs sync operations against farmOS and the local database.

use chrono::Utc;

use super::operation::{SyncOperation, SyncRequest};
use crate::db::AreaRepository;
use crate::farmos::{AuthError, FarmOsClient, PageWalk, Record, Transport};
use crate::models::{Area, RecordKind};

/// Outcome of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    Succeeded,
    /// Holds a short description for the user; details go to the log.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationReport {
    pub kind: RecordKind,
    /// Records received from farmOS.
    pub fetched: usize,
    /// Rows written locally.
    pub stored: usize,
    /// Records that could not be converted.
    pub skipped: usize,
    /// Pages farmOS did not deliver. Their records are absent from `fetched`.
    pub missing_pages: usize,
    pub status: OperationStatus,
}

impl OperationReport {
    fn failed(kind: RecordKind, fetched: usize, reason: &str) -> Self {
        Self {
            kind,
            fetched,
            stored: 0,
            skipped: 0,
            missing_pages: 0,
            status: OperationStatus::Failed(reason.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OperationStatus::Succeeded
    }
}

/// Summary of a whole sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub operations: Vec<OperationReport>,
}

impl SyncReport {
    pub fn succeeded(&self) -> usize {
        self.operations.iter().filter(|op| op.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.operations.len() - self.succeeded()
    }

    pub fn stored(&self) -> usize {
        self.operations.iter().map(|op| op.stored).sum()
    }
}

/// Drives a [`SyncRequest`] to completion, one operation at a time.
pub struct SyncRunner<'a, T> {
    client: &'a mut FarmOsClient<T>,
    areas: &'a AreaRepository,
}

impl<'a, T: Transport> SyncRunner<'a, T> {
    pub fn new(client: &'a mut FarmOsClient<T>, areas: &'a AreaRepository) -> Self {
        Self { client, areas }
    }

    /// Authenticates if needed, then runs every operation in the request.
    ///
    /// Only a failed login aborts the run. A failing operation is recorded in
    /// the report and the next one still runs.
    pub async fn run(&mut self, request: &SyncRequest) -> Result<SyncReport, AuthError> {
        let operations = request.operations();
        let mut report = SyncReport::default();
        if operations.is_empty() {
            return Ok(report);
        }

        if !self.client.is_authenticated() {
            self.client.authenticate().await?;
        }

        for operation in &operations {
            report.operations.push(self.run_operation(operation).await);
        }

        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            stored = report.stored(),
            "sync finished"
        );
        Ok(report)
    }

    async fn run_operation(&self, operation: &SyncOperation) -> OperationReport {
        match operation.kind {
            RecordKind::Areas => self.sync_areas(operation).await,
        }
    }

    async fn sync_areas(&self, operation: &SyncOperation) -> OperationReport {
        let kind = operation.kind;

        let walk = match self.client.walk_areas(&operation.filters).await {
            Ok(walk) => walk,
            Err(e) => {
                let entity_type = operation.entity_type;
                tracing::warn!(%kind, entity_type, error = %e, "fetch failed");
                return OperationReport::failed(kind, 0, "could not reach farmOS");
            }
        };

        if !walk.is_complete() {
            tracing::warn!(%kind, missing = ?walk.missing_pages, "some pages were not delivered");
        }
        let PageWalk {
            records,
            missing_pages,
        } = walk;
        let (areas, skipped) = convert_areas(&records);

        match self.areas.upsert_all(&areas).await {
            Ok(stored) => {
                tracing::info!(%kind, fetched = records.len(), stored, skipped, "synced");
                OperationReport {
                    kind,
                    fetched: records.len(),
                    stored,
                    skipped,
                    missing_pages: missing_pages.len(),
                    status: OperationStatus::Succeeded,
                }
            }
            Err(e) => {
                tracing::error!(%kind, error = %e, "saving areas failed, batch rolled back");
                OperationReport::failed(kind, records.len(), "could not save to the local database")
            }
        }
    }
}

fn convert_areas(records: &[Record]) -> (Vec<Area>, usize) {
    let synced_at = Utc::now();
    let mut areas = Vec::with_capacity(records.len());
    let mut skipped = 0;

    for record in records {
        match Area::from_record(record, synced_at) {
            Some(area) => areas.push(area),
            None => {
                skipped += 1;
                tracing::debug!(id = ?record.id(), "skipping area record without id or name");
            }
        }
    }

    (areas, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::farmos::fake::FakeTransport;
    use crate::farmos::{Credentials, TransportError};
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn setup() -> (AreaRepository, TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let pool = init_db(&temp_dir.path().join("test.db")).await.unwrap();
        (AreaRepository::new(pool), temp_dir)
    }

    fn logged_in(transport: FakeTransport) -> FakeTransport {
        FakeTransport::new()
            .respond(200, "")
            .respond(200, "token")
            .push_all(transport)
    }

    fn vocabularies() -> serde_json::Value {
        json!({"list": [{"vid": 7, "machine_name": "farm_areas"}]})
    }

    fn areas_request() -> SyncRequest {
        SyncRequest::new(vec![RecordKind::Areas])
    }

    fn client(transport: FakeTransport) -> (FarmOsClient<Arc<FakeTransport>>, Arc<FakeTransport>) {
        let transport = Arc::new(transport);
        let client = FarmOsClient::new(
            Arc::clone(&transport),
            Credentials::new("farm.example.com", "farmer", "secret"),
        );
        (client, transport)
    }

    #[tokio::test]
    async fn test_sync_stores_areas() {
        let (repo, _dir) = setup().await;
        let (mut farm, transport) = client(logged_in(
            FakeTransport::new()
                .respond_json(vocabularies())
                .respond_json(json!({"list": [
                    {"tid": "1", "name": "Barn", "field_farm_area_type": "building"},
                    {"tid": "2", "name": "North field", "field_farm_area_type": "field"},
                    {"name": "no id"}
                ]})),
        ));

        let report = SyncRunner::new(&mut farm, &repo)
            .run(&areas_request())
            .await
            .unwrap();

        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 0);
        assert_eq!(report.operations[0].fetched, 3);
        assert_eq!(report.operations[0].stored, 2);
        assert_eq!(report.operations[0].skipped, 1);
        assert_eq!(repo.count().await.unwrap(), 2);
        assert_eq!(transport.requests().len(), 4);
    }

    #[tokio::test]
    async fn test_sync_twice_updates_in_place() {
        let (repo, _dir) = setup().await;
        let (mut farm, _) = client(logged_in(
            FakeTransport::new()
                .respond_json(vocabularies())
                .respond_json(json!({"list": [{"tid": 1, "name": "Barn"}]}))
                .respond_json(vocabularies())
                .respond_json(json!({"list": [{"tid": 1, "name": "Red barn"}]})),
        ));

        let mut runner = SyncRunner::new(&mut farm, &repo);
        runner.run(&areas_request()).await.unwrap();
        runner.run(&areas_request()).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(repo.get_by_id(1).await.unwrap().unwrap().name, "Red barn");
    }

    #[tokio::test]
    async fn test_sync_passes_area_type_filter() {
        let (repo, _dir) = setup().await;
        let (mut farm, transport) = client(logged_in(
            FakeTransport::new()
                .respond_json(vocabularies())
                .respond_json(json!({"list": []})),
        ));

        SyncRunner::new(&mut farm, &repo)
            .run(&areas_request().with_area_type("field"))
            .await
            .unwrap();

        assert_eq!(
            transport.urls()[3],
            "http://farm.example.com/taxonomy_term.json?area_type=field&vocabulary=7"
        );
    }

    #[tokio::test]
    async fn test_lost_page_is_counted_in_report() {
        let (repo, _dir) = setup().await;
        let last = "http://farm.example.com/taxonomy_term.json?vocabulary=7&page=2";
        let (mut farm, _) = client(logged_in(
            FakeTransport::new()
                .respond_json(vocabularies())
                .respond_json(json!({"list": [{"tid": 1, "name": "Barn"}], "last": last}))
                .respond(500, "")
                .respond_json(json!({"list": [{"tid": 5, "name": "Pond"}], "last": last})),
        ));

        let report = SyncRunner::new(&mut farm, &repo)
            .run(&areas_request())
            .await
            .unwrap();

        let op = &report.operations[0];
        assert!(op.is_success());
        assert_eq!(op.missing_pages, 1);
        assert_eq!(op.stored, 2);
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_login_failure_aborts_run() {
        let (repo, _dir) = setup().await;
        let (mut farm, transport) = client(FakeTransport::new().respond(403, ""));

        let result = SyncRunner::new(&mut farm, &repo).run(&areas_request()).await;

        assert!(matches!(result, Err(AuthError::LoginRejected { status: 403 })));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_request_sends_nothing() {
        let (repo, _dir) = setup().await;
        let (mut farm, transport) = client(FakeTransport::new());

        let report = SyncRunner::new(&mut farm, &repo)
            .run(&SyncRequest::default())
            .await
            .unwrap();

        assert!(report.operations.is_empty());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_marks_operation_failed() {
        let (repo, _dir) = setup().await;
        let (mut farm, _) = client(logged_in(FakeTransport::new().push(Err(
            TransportError::Request {
                url: "http://farm.example.com/taxonomy_vocabulary.json".into(),
                reason: "timed out".into(),
            },
        ))));

        let report = SyncRunner::new(&mut farm, &repo)
            .run(&areas_request())
            .await
            .unwrap();

        assert_eq!(report.failed(), 1);
        assert!(matches!(report.operations[0].status, OperationStatus::Failed(_)));
    }

    #[tokio::test]
    async fn test_missing_vocabulary_syncs_nothing() {
        let (repo, _dir) = setup().await;
        let (mut farm, transport) = client(logged_in(
            FakeTransport::new().respond_json(json!({"list": []})),
        ));

        let report = SyncRunner::new(&mut farm, &repo)
            .run(&areas_request())
            .await
            .unwrap();

        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.stored(), 0);
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_already_authenticated_client_skips_login() {
        let (repo, _dir) = setup().await;
        let (mut farm, transport) = client(logged_in(
            FakeTransport::new()
                .respond_json(vocabularies())
                .respond_json(json!({"list": [{"tid": 4, "name": "Pond"}]})),
        ));
        farm.authenticate().await.unwrap();

        SyncRunner::new(&mut farm, &repo)
            .run(&areas_request())
            .await
            .unwrap();

        assert_eq!(transport.requests().len(), 4);
    }
}
