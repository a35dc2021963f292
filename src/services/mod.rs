//! Entity services over the admin REST boundary. Each is a thin, cloneable
//! wrapper around the shared `ApiClient`; every loader returns a typed error
//! instead of an empty list when the call fails.

use crate::api::ApiClient;

pub mod content;
pub mod questions;
pub mod topics;
pub mod vocabulary;

pub use content::ContentService;
pub use questions::QuestionService;
pub use topics::TopicService;
pub use vocabulary::VocabularyService;

/// All services sharing one HTTP client.
#[derive(Clone, Debug)]
pub struct Services {
    pub topics: TopicService,
    pub content: ContentService,
    pub questions: QuestionService,
    pub vocabulary: VocabularyService,
}

impl Services {
    pub fn new(api: ApiClient) -> Self {
        Self {
            topics: TopicService::new(api.clone()),
            content: ContentService::new(api.clone()),
            questions: QuestionService::new(api.clone()),
            vocabulary: VocabularyService::new(api),
        }
    }
}

/// Map a 404 on a single-entity GET to `None`.
pub(crate) fn found<T>(res: Result<T, crate::error::ApiError>) -> Result<Option<T>, crate::error::ApiError> {
    match res {
        Ok(v) => Ok(Some(v)),
        Err(crate::error::ApiError::NotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}
