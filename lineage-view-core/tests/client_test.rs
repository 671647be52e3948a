use async_trait::async_trait;
use lineage_view::client::{LineageApi, LineageMutations};
use lineage_view::edit::new_lineage_connection;
use lineage_view::errors::{ApiError, ApiResult};
use lineage_view::model::{
    AddLineage, EdgeData, EdgeEndpoint, EntityLineage, EntityReference, EntityType,
};
use lineage_view::notify::{notification_text, Message, Notifier};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Fails with the configured status, counting every call
#[derive(Default)]
struct MockApi {
    fail_with: Option<(u16, String)>,
    calls: AtomicUsize,
    added: Mutex<Vec<AddLineage>>,
}

impl MockApi {
    fn failing(status: u16, body: &str) -> Self {
        Self {
            fail_with: Some((status, body.to_string())),
            ..Default::default()
        }
    }

    fn outcome(&self) -> ApiResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.fail_with {
            Some((status, body)) => Err(ApiError::Status {
                status: *status,
                body: body.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LineageApi for MockApi {
    async fn get_lineage(
        &self,
        entity_type: EntityType,
        fqn: &str,
        _upstream_depth: u32,
        _downstream_depth: u32,
    ) -> ApiResult<EntityLineage> {
        self.outcome()?;
        Ok(EntityLineage::new(
            EntityReference::new("focal", entity_type).with_fqn(fqn),
        ))
    }

    async fn add_lineage(&self, request: &AddLineage) -> ApiResult<()> {
        self.outcome()?;
        if let Ok(mut added) = self.added.lock() {
            added.push(request.clone());
        }
        Ok(())
    }

    async fn delete_lineage_edge(&self, _edge: &EdgeData) -> ApiResult<()> {
        self.outcome()
    }
}

#[derive(Default)]
struct RecordingNotifier {
    shown: Mutex<Vec<String>>,
}

impl Notifier for RecordingNotifier {
    fn error(&self, err: &ApiError, fallback: &Message) {
        if let Ok(mut shown) = self.shown.lock() {
            shown.push(notification_text(err, fallback));
        }
    }
}

fn request() -> AddLineage {
    let from = EdgeEndpoint {
        id: "a".to_string(),
        entity_type: EntityType::Table,
    };
    let to = EdgeEndpoint {
        id: "b".to_string(),
        entity_type: EntityType::Dashboard,
    };
    new_lineage_connection(None, Some("pipeline-1"), &from, &to).1
}

fn edge_data() -> EdgeData {
    EdgeData {
        from_entity: EntityType::Table,
        from_id: "a".to_string(),
        to_entity: EntityType::Dashboard,
        to_id: "b".to_string(),
    }
}

#[tokio::test]
async fn successful_add_reaches_api_once() {
    let mutations = LineageMutations::new(MockApi::default(), RecordingNotifier::default());
    mutations.add_lineage_edge(&request()).await.unwrap();

    assert_eq!(mutations.api().added.lock().unwrap().len(), 1);
    assert_eq!(mutations.api().calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_add_notifies_once_and_returns_error() {
    let notifier = std::sync::Arc::new(RecordingNotifier::default());
    let mutations =
        LineageMutations::new(MockApi::failing(500, ""), SharedNotifier(notifier.clone()));

    let err = mutations.add_lineage_edge(&request()).await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 500, .. }));
    assert_eq!(mutations.api().calls.load(Ordering::SeqCst), 1, "no retry");
    assert_eq!(
        *notifier.shown.lock().unwrap(),
        vec!["Error while adding Lineage!".to_string()]
    );
}

#[tokio::test]
async fn failed_remove_surfaces_server_message() {
    let api = MockApi::failing(409, r#"{"code":409,"message":"Edge is referenced by a pipeline"}"#);
    let notifier = std::sync::Arc::new(RecordingNotifier::default());
    let mutations = LineageMutations::new(api, SharedNotifier(notifier.clone()));

    let err = mutations.remove_lineage_edge(&edge_data()).await.unwrap_err();
    assert!(err.is_client_error());

    let shown = notifier.shown.lock().unwrap();
    assert_eq!(*shown, vec!["Edge is referenced by a pipeline".to_string()]);
}

#[tokio::test]
async fn failed_fetch_falls_back_to_message() {
    let notifier = std::sync::Arc::new(RecordingNotifier::default());
    let mutations = LineageMutations::new(
        MockApi::failing(503, "   "),
        SharedNotifier(notifier.clone()),
    );

    let err = mutations
        .fetch_lineage(EntityType::Table, "svc.db.s.t", 1, 1)
        .await
        .unwrap_err();
    assert!(!err.is_not_found());
    assert_eq!(
        *notifier.shown.lock().unwrap(),
        vec!["Error while fetching Lineage!".to_string()]
    );
}

#[tokio::test]
async fn fetch_passes_through_document() {
    let mutations = LineageMutations::new(MockApi::default(), RecordingNotifier::default());
    let lineage = mutations
        .fetch_lineage(EntityType::Topic, "kafka.orders", 2, 2)
        .await
        .unwrap();
    assert_eq!(lineage.entity.entity_type, EntityType::Topic);
    assert_eq!(lineage.entity.fully_qualified_name.as_deref(), Some("kafka.orders"));
}

struct SharedNotifier(std::sync::Arc<RecordingNotifier>);

impl Notifier for SharedNotifier {
    fn error(&self, err: &ApiError, fallback: &Message) {
        self.0.error(err, fallback);
    }
}
