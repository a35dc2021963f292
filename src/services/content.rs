use reqwest::Method;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::api::{ApiClient, Retry};
use crate::domain::{Content, ContentDraft, EntityId};
use crate::error::ApiError;
use crate::ordering::MoveDirection;
use crate::protocol::{CreatedOut, PatchAction};

use super::found;

const CONTENT: &str = "/api/admin/content";
const PAGINATED: &str = "/api/admin/content/paginated";

/// Page size used when loading the content of a handful of topics.
pub const DEFAULT_PAGE_LIMIT: usize = 200;

/// The paginated endpoint answers either a bare array or an object wrapping it.
#[derive(Deserialize)]
#[serde(untagged)]
enum ContentPage {
    Items(Vec<Content>),
    Wrapped {
        #[serde(alias = "data", alias = "items")]
        content: Vec<Content>,
        #[serde(default)]
        total: Option<usize>,
    },
}

impl ContentPage {
    /// Rows plus whether the server held back more than it sent.
    fn into_items(self, limit: usize) -> (Vec<Content>, bool) {
        match self {
            ContentPage::Items(v) => {
                let truncated = v.len() >= limit;
                (v, truncated)
            }
            ContentPage::Wrapped { content, total } => {
                let truncated = match total {
                    Some(t) => t > content.len(),
                    None => content.len() >= limit,
                };
                (content, truncated)
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct ContentService {
    api: ApiClient,
}

impl ContentService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Every content row (unfiltered).
    #[instrument(level = "info", skip(self))]
    pub async fn list(&self) -> Result<Vec<Content>, ApiError> {
        let rows: Vec<Content> = self.api.get(CONTENT, &[]).await?;
        info!(target: "catalog", count = rows.len(), "Content listed");
        Ok(rows)
    }

    /// Content of the given topics only. A page that comes back full (or
    /// reports a larger `total`) is replaced by the full list, filtered here.
    #[instrument(level = "info", skip(self, topic_ids), fields(topics = topic_ids.len()))]
    pub async fn list_for_topics(&self, topic_ids: &[EntityId], limit: usize) -> Result<Vec<Content>, ApiError> {
        let ids = topic_ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",");
        let query = [("topicIds", ids), ("limit", limit.to_string())];
        let page: ContentPage = self.api.get(PAGINATED, &query).await?;
        let (rows, truncated) = page.into_items(limit.max(1));
        if truncated {
            warn!(target: "catalog", count = rows.len(), limit, "Content page truncated; loading the full list");
            let all = self.list().await?;
            return Ok(all.into_iter().filter(|c| topic_ids.contains(&c.topicid)).collect());
        }
        info!(target: "catalog", count = rows.len(), "Content page loaded");
        Ok(rows)
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn get(&self, id: EntityId) -> Result<Option<Content>, ApiError> {
        found(self.api.get(&format!("{CONTENT}/{id}"), &[]).await)
    }

    #[instrument(level = "info", skip(self, draft), fields(title = %draft.title, topicid = draft.topicid))]
    pub async fn create(&self, draft: &ContentDraft) -> Result<EntityId, ApiError> {
        draft.validate()?;
        let out: CreatedOut = self.api.send(Method::POST, CONTENT, draft, Retry::Once).await?;
        info!(target: "catalog", id = out.id, "Content created");
        Ok(out.id)
    }

    #[instrument(level = "info", skip(self, draft))]
    pub async fn update(&self, id: EntityId, draft: &ContentDraft) -> Result<(), ApiError> {
        draft.validate()?;
        self.api.send_unit(Method::PUT, &format!("{CONTENT}/{id}"), draft, Retry::Idempotent).await
    }

    /// Deleting content also deletes its questions server-side.
    #[instrument(level = "info", skip(self))]
    pub async fn remove(&self, id: EntityId) -> Result<(), ApiError> {
        self.api.delete(&format!("{CONTENT}/{id}")).await
    }

    #[instrument(level = "info", skip(self))]
    pub async fn move_content(&self, id: EntityId, dir: MoveDirection, topic_id: EntityId) -> Result<(), ApiError> {
        let body = PatchAction::content_move(dir, topic_id);
        self.api.send_unit(Method::PATCH, &format!("{CONTENT}/{id}"), &body, Retry::Once).await
    }

    #[instrument(level = "info", skip(self))]
    pub async fn toggle_visibility(&self, id: EntityId) -> Result<(), ApiError> {
        self.api
            .send_unit(Method::PATCH, &format!("{CONTENT}/{id}"), &PatchAction::ToggleVisibility, Retry::Once)
            .await
    }
}
