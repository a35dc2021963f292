use reqwest::Method;
use tracing::{info, instrument};

use crate::api::{ApiClient, Retry};
use crate::domain::VocabularyItem;
use crate::error::ApiError;
use crate::protocol::{VocabularySearchIn, VocabularySearchOut};

const SEARCH: &str = "/api/vocabulary/search";

#[derive(Clone, Debug)]
pub struct VocabularyService {
    api: ApiClient,
}

impl VocabularyService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Look up vocabulary entries for the given words. Read-only, so it is retried like a GET.
    #[instrument(level = "info", skip(self, words), fields(words = words.len()))]
    pub async fn search(&self, words: &[String]) -> Result<Vec<VocabularyItem>, ApiError> {
        if words.is_empty() {
            return Ok(Vec::new());
        }
        let body = VocabularySearchIn { words: words.to_vec() };
        let out: VocabularySearchOut = self.api.send(Method::POST, SEARCH, &body, Retry::Idempotent).await?;
        info!(target: "catalog", requested = words.len(), matched = out.vocabulary_items.len(), "Vocabulary search done");
        Ok(out.vocabulary_items)
    }
}
