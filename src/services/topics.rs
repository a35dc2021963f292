use reqwest::Method;
use tracing::{info, instrument};

use crate::api::{ApiClient, Retry};
use crate::domain::{EntityId, Topic, TopicDraft, UnitGroup};
use crate::error::ApiError;
use crate::ordering::MoveDirection;
use crate::protocol::{CreatedOut, PatchAction};

use super::found;

const TOPICS: &str = "/api/admin/topics";
const BY_UNIT: &str = "/api/topics/by-unit";

#[derive(Clone, Debug, Default)]
pub struct TopicFilter {
    pub program: Option<String>,
    pub unit: Option<String>,
}

#[derive(Clone, Debug)]
pub struct TopicService {
    api: ApiClient,
}

impl TopicService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    #[instrument(level = "info", skip(self), fields(program = ?filter.program, unit = ?filter.unit))]
    pub async fn list(&self, filter: &TopicFilter) -> Result<Vec<Topic>, ApiError> {
        let mut query = Vec::new();
        if let Some(p) = &filter.program {
            query.push(("program", p.clone()));
        }
        if let Some(u) = &filter.unit {
            query.push(("unit", u.clone()));
        }
        let topics: Vec<Topic> = self.api.get(TOPICS, &query).await?;
        info!(target: "catalog", count = topics.len(), "Topics listed");
        Ok(topics)
    }

    /// Unit outline for a program. Without `unit` the server may return
    /// placeholder groups (empty `topics`); with `unit` it returns that unit filled.
    #[instrument(level = "info", skip(self), fields(%program, ?unit))]
    pub async fn by_unit(&self, program: &str, unit: Option<&str>) -> Result<Vec<UnitGroup>, ApiError> {
        let mut query = vec![("program", program.to_string())];
        if let Some(u) = unit {
            query.push(("unit", u.to_string()));
        }
        self.api.get(BY_UNIT, &query).await
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn get(&self, id: EntityId) -> Result<Option<Topic>, ApiError> {
        found(self.api.get(&format!("{TOPICS}/{id}"), &[]).await)
    }

    #[instrument(level = "info", skip(self, draft), fields(name = %draft.name, unit = %draft.unit))]
    pub async fn create(&self, draft: &TopicDraft) -> Result<EntityId, ApiError> {
        draft.validate()?;
        let out: CreatedOut = self.api.send(Method::POST, TOPICS, draft, Retry::Once).await?;
        info!(target: "catalog", id = out.id, "Topic created");
        Ok(out.id)
    }

    #[instrument(level = "info", skip(self, draft))]
    pub async fn update(&self, id: EntityId, draft: &TopicDraft) -> Result<(), ApiError> {
        draft.validate()?;
        self.api.send_unit(Method::PUT, &format!("{TOPICS}/{id}"), draft, Retry::Idempotent).await
    }

    /// Deleting a topic also deletes its content and questions server-side.
    #[instrument(level = "info", skip(self))]
    pub async fn remove(&self, id: EntityId) -> Result<(), ApiError> {
        self.api.delete(&format!("{TOPICS}/{id}")).await
    }

    /// Swap position with the neighbouring topic of the same unit. A move past
    /// either end is a no-op on the server.
    #[instrument(level = "info", skip(self), fields(?dir, %unit))]
    pub async fn move_topic(&self, id: EntityId, dir: MoveDirection, unit: &str) -> Result<(), ApiError> {
        let body = PatchAction::topic_move(dir, unit);
        self.api.send_unit(Method::PATCH, &format!("{TOPICS}/{id}"), &body, Retry::Once).await
    }

    #[instrument(level = "info", skip(self))]
    pub async fn toggle_visibility(&self, id: EntityId) -> Result<(), ApiError> {
        self.api
            .send_unit(Method::PATCH, &format!("{TOPICS}/{id}"), &PatchAction::ToggleVisibility, Retry::Once)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_api::{self, MockDb};
    use crate::ordering::sorted_by_order_index;

    #[tokio::test]
    async fn crud_round_trip_against_mock() {
        let mock = mock_api::spawn(MockDb::default()).await;
        let svc = TopicService::new(mock.client());

        let draft = TopicDraft {
            name: "Animals".into(),
            short_summary: "Farm animals".into(),
            unit: "Unit 1".into(),
            program: "Grapeseed".into(),
            ..Default::default()
        };
        let id = svc.create(&draft).await.unwrap();
        let got = svc.get(id).await.unwrap().expect("created topic");
        assert_eq!(got.name, "Animals");

        let mut renamed = draft.clone();
        renamed.name = "Wild animals".into();
        svc.update(id, &renamed).await.unwrap();
        assert_eq!(svc.get(id).await.unwrap().unwrap().name, "Wild animals");

        svc.remove(id).await.unwrap();
        assert!(svc.get(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalid_draft_never_reaches_the_server() {
        let mock = mock_api::spawn(MockDb::default()).await;
        let svc = TopicService::new(mock.client());
        let err = svc.create(&TopicDraft::default()).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(mock.hits("POST /api/admin/topics"), 0);
    }

    #[tokio::test]
    async fn move_and_toggle_are_applied_by_the_server() {
        let mut db = MockDb::default();
        let a = db.add_topic("A", "Unit 1", Some(0));
        let b = db.add_topic("B", "Unit 1", Some(1));
        let mock = mock_api::spawn(db).await;
        let svc = TopicService::new(mock.client());

        svc.move_topic(a, MoveDirection::Up, "Unit 1").await.unwrap();
        svc.move_topic(a, MoveDirection::Down, "Unit 1").await.unwrap();
        let topics = svc.list(&TopicFilter { unit: Some("Unit 1".into()), ..Default::default() }).await.unwrap();
        let order: Vec<EntityId> = sorted_by_order_index(&topics).iter().map(|t| t.id).collect();
        assert_eq!(order, vec![b, a]);

        svc.toggle_visibility(b).await.unwrap();
        assert_eq!(svc.get(b).await.unwrap().unwrap().visible, Some(false));
    }

    #[tokio::test]
    async fn missing_topic_is_none_and_unknown_patch_is_not_found() {
        let mock = mock_api::spawn(MockDb::default()).await;
        let svc = TopicService::new(mock.client());
        assert!(svc.get(404).await.unwrap().is_none());
        let err = svc.toggle_visibility(404).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound { ref id, .. } if id == "404"));
    }

    #[tokio::test]
    async fn transient_failures_are_retried_for_reads() {
        let mut db = MockDb::default();
        db.add_topic("A", "Unit 1", Some(0));
        db.fail_next = 2;
        let mock = mock_api::spawn(db).await;
        let svc = TopicService::new(mock.client());
        let topics = svc.list(&TopicFilter::default()).await.unwrap();
        assert_eq!(topics.len(), 1);
        assert_eq!(mock.hits("GET /api/admin/topics"), 3);
    }

    #[tokio::test]
    async fn persistent_failure_surfaces_instead_of_empty_list() {
        let mut db = MockDb::default();
        db.fail_next = 10;
        let mock = mock_api::spawn(db).await;
        let svc = TopicService::new(mock.client());
        let err = svc.list(&TopicFilter::default()).await.unwrap_err();
        assert!(matches!(err, ApiError::Server { status: 503, .. }));
        assert_eq!(mock.hits("GET /api/admin/topics"), 3);
    }

    #[tokio::test]
    async fn patch_is_not_retried() {
        let mut db = MockDb::default();
        let a = db.add_topic("A", "Unit 1", Some(0));
        db.fail_next = 1;
        let mock = mock_api::spawn(db).await;
        let svc = TopicService::new(mock.client());
        assert!(svc.toggle_visibility(a).await.is_err());
        assert_eq!(mock.hits(&format!("PATCH /api/admin/topics/{a}")), 1);
    }

    #[tokio::test]
    async fn by_unit_returns_placeholders_then_filled_unit() {
        let mut db = MockDb::default();
        db.add_topic("A", "Unit 1", Some(0));
        db.add_topic("B", "Unit 2", Some(0));
        let mock = mock_api::spawn(db).await;
        let svc = TopicService::new(mock.client());

        let outline = svc.by_unit("Grapeseed", None).await.unwrap();
        assert_eq!(outline.len(), 2);
        assert!(outline.iter().all(|g| g.is_placeholder()));

        let filled = svc.by_unit("Grapeseed", Some("Unit 2")).await.unwrap();
        assert_eq!(filled.len(), 1);
        assert_eq!(filled[0].topics[0].name, "B");
    }
}
