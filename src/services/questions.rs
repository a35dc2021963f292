use reqwest::Method;
use tracing::{error, info, instrument};

use crate::api::{ApiClient, Retry};
use crate::domain::{Content, ContentDraft, EntityId, Question, QuestionDraft};
use crate::error::ApiError;
use crate::protocol::CreatedOut;

use super::found;

const QUESTIONS: &str = "/api/admin/questions";
const CONTENT: &str = "/api/admin/content";

#[derive(Clone, Debug)]
pub struct QuestionService {
    api: ApiClient,
}

impl QuestionService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    #[instrument(level = "info", skip(self))]
    pub async fn list(&self) -> Result<Vec<Question>, ApiError> {
        self.api.get(QUESTIONS, &[]).await
    }

    #[instrument(level = "info", skip(self))]
    pub async fn list_for_content(&self, content_id: EntityId) -> Result<Vec<Question>, ApiError> {
        let rows: Vec<Question> = self.api.get(QUESTIONS, &[("contentId", content_id.to_string())]).await?;
        info!(target: "catalog", content_id, count = rows.len(), "Questions loaded");
        Ok(rows)
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn get(&self, id: EntityId) -> Result<Option<Question>, ApiError> {
        found(self.api.get(&format!("{QUESTIONS}/{id}"), &[]).await)
    }

    #[instrument(level = "info", skip(self, draft), fields(contentid = draft.contentid))]
    pub async fn create(&self, draft: &QuestionDraft) -> Result<EntityId, ApiError> {
        draft.validate()?;
        let out: CreatedOut = self.api.send(Method::POST, QUESTIONS, draft, Retry::Once).await?;
        info!(target: "catalog", id = out.id, "Question created");
        Ok(out.id)
    }

    #[instrument(level = "info", skip(self, draft))]
    pub async fn update(&self, id: EntityId, draft: &QuestionDraft) -> Result<(), ApiError> {
        draft.validate()?;
        self.api.send_unit(Method::PUT, &format!("{QUESTIONS}/{id}"), draft, Retry::Idempotent).await
    }

    #[instrument(level = "info", skip(self))]
    pub async fn remove(&self, id: EntityId) -> Result<(), ApiError> {
        self.api.delete(&format!("{QUESTIONS}/{id}")).await
    }

    /// Create a question, then store the parent's new `question_count`.
    ///
    /// The two writes are not transactional: if the count update fails after
    /// the question was created, the result is `ApiError::Partial` and the
    /// returned content is not updated.
    #[instrument(level = "info", skip(self, content, draft), fields(content_id = content.id))]
    pub async fn create_for_content(&self, content: &Content, draft: &QuestionDraft) -> Result<(EntityId, Content), ApiError> {
        if draft.contentid != content.id {
            return Err(ApiError::Validation(format!(
                "question belongs to content {} but was added to {}",
                draft.contentid, content.id
            )));
        }
        let id = self.create(draft).await?;

        let refreshed = async {
            let count = self.list_for_content(content.id).await?.len() as i64;
            let mut updated = content.clone();
            updated.question_count = count;
            self.api
                .send_unit(Method::PUT, &format!("{CONTENT}/{}", content.id), &ContentDraft::from(&updated), Retry::Idempotent)
                .await?;
            Ok::<_, ApiError>(updated)
        }
        .await;

        match refreshed {
            Ok(updated) => Ok((id, updated)),
            Err(e) => {
                error!(target: "catalog", question_id = id, content_id = content.id, error = %e, "Question created but question_count update failed");
                Err(ApiError::Partial {
                    completed: format!("question {id} created"),
                    failed: Box::new(e),
                })
            }
        }
    }
}
