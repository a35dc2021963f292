use thiserror::Error;

/// Failure surfaced by every service and store operation. Callers can tell an
/// empty result apart from a failed one.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("network failure: {0}")]
    Network(String),
    #[error("{resource} {id} not found")]
    NotFound { resource: String, id: String },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("server returned HTTP {status}: {message}")]
    Server { status: u16, message: String },
    #[error("could not decode response: {0}")]
    Decode(String),
    #[error("partially applied: {completed} succeeded, then {failed}")]
    Partial {
        completed: String,
        #[source]
        failed: Box<ApiError>,
    },
}

impl ApiError {
    /// Worth retrying with backoff: transport failures, 5xx and 429.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Network(_) => true,
            ApiError::Server { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Decode(e.to_string())
    }
}
