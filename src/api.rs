//! HTTP transport for the admin REST boundary.
//!
//! Every call is JSON in / JSON out. Non-success statuses are mapped onto
//! `ApiError` (404 -> NotFound, 400/422 -> Validation, anything else -> Server).
//! Idempotent calls are retried with bounded exponential backoff on transient
//! failures; creates and PATCH actions are attempted once.
//!
//! NOTE: response bodies are only logged truncated.

use std::time::{Duration, Instant};

use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::config::{RetryConfig, StudioConfig};
use crate::error::ApiError;
use crate::protocol::extract_error_message;
use crate::util::trunc_for_log;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Retry {
  Idempotent,
  Once,
}

#[derive(Clone, Debug)]
pub struct ApiClient {
  pub client: reqwest::Client,
  pub base_url: String,
  pub user_agent: String,
  pub retry: RetryConfig,
}

impl ApiClient {
  pub fn new(base_url: impl Into<String>, timeout: Duration, retry: RetryConfig) -> Result<Self, ApiError> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {e}")))?;
    Ok(Self {
      client,
      base_url: base_url.into().trim_end_matches('/').to_string(),
      user_agent: "lesson-studio/0.1".into(),
      retry,
    })
  }

  pub fn from_config(cfg: &StudioConfig) -> Result<Self, ApiError> {
    let mut api = Self::new(
      cfg.api.base_url.clone(),
      Duration::from_secs(cfg.api.timeout_secs),
      cfg.retry.clone(),
    )?;
    api.user_agent = cfg.api.user_agent.clone();
    Ok(api)
  }

  pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ApiError> {
    let text = self.call(Method::GET, path, query, None, Retry::Idempotent).await?;
    decode(&text)
  }

  pub async fn send<T: DeserializeOwned, B: Serialize>(
    &self,
    method: Method,
    path: &str,
    body: &B,
    retry: Retry,
  ) -> Result<T, ApiError> {
    let body = serde_json::to_value(body)?;
    let text = self.call(method, path, &[], Some(body), retry).await?;
    decode(&text)
  }

  /// Like `send` but ignores whatever the server returns on success.
  pub async fn send_unit<B: Serialize>(&self, method: Method, path: &str, body: &B, retry: Retry) -> Result<(), ApiError> {
    let body = serde_json::to_value(body)?;
    self.call(method, path, &[], Some(body), retry).await.map(|_| ())
  }

  pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
    self.call(Method::DELETE, path, &[], None, Retry::Idempotent).await.map(|_| ())
  }

  /// One logical call, retried per policy. Returns the raw success body.
  #[instrument(level = "debug", skip(self, query, body), fields(%method, %path))]
  async fn call(
    &self,
    method: Method,
    path: &str,
    query: &[(&str, String)],
    body: Option<serde_json::Value>,
    retry: Retry,
  ) -> Result<String, ApiError> {
    let max_attempts = match retry {
      Retry::Idempotent => self.retry.max_attempts.max(1),
      Retry::Once => 1,
    };
    let mut attempt = 1;
    loop {
      let start = Instant::now();
      let result = self.call_once(method.clone(), path, query, body.as_ref()).await;
      let elapsed = start.elapsed();
      match result {
        Err(e) if e.is_transient() && attempt < max_attempts => {
          let delay = self.retry.backoff(attempt);
          warn!(target: "lesson_studio", %path, attempt, ?elapsed, ?delay, error = %e, "Transient API failure; retrying");
          tokio::time::sleep(delay).await;
          attempt += 1;
        }
        Err(e) => {
          warn!(target: "lesson_studio", %path, attempt, ?elapsed, error = %e, "API call failed");
          return Err(e);
        }
        Ok(text) => {
          debug!(target: "lesson_studio", %path, attempt, ?elapsed, bytes = text.len(), "API call succeeded");
          return Ok(text);
        }
      }
    }
  }

  async fn call_once(
    &self,
    method: Method,
    path: &str,
    query: &[(&str, String)],
    body: Option<&serde_json::Value>,
  ) -> Result<String, ApiError> {
    let url = format!("{}{}", self.base_url, path);
    let mut req = self.client.request(method, &url)
      .header(USER_AGENT, self.user_agent.as_str())
      .header(ACCEPT, "application/json");
    if !query.is_empty() { req = req.query(query); }
    if let Some(b) = body { req = req.json(b); }

    let res = req.send().await?;
    let status = res.status();
    let text = res.text().await?;
    if status.is_success() {
      return Ok(text);
    }

    debug!(target: "lesson_studio", %url, status = status.as_u16(), body = %trunc_for_log(&text, 200), "Non-success response");
    Err(status_error(status, path, &text))
  }
}

fn status_error(status: StatusCode, path: &str, body: &str) -> ApiError {
  let message = extract_error_message(body);
  match status {
    StatusCode::NOT_FOUND => {
      let (resource, id) = resource_and_id(path);
      ApiError::NotFound { resource, id }
    }
    StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ApiError::Validation(message),
    _ => ApiError::Server { status: status.as_u16(), message },
  }
}

/// "/api/admin/topics/12" -> ("topics", "12"); "/api/admin/content" -> ("content", "").
fn resource_and_id(path: &str) -> (String, String) {
  let segs: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
  match segs.as_slice() {
    [.., res, id] if id.chars().all(|c| c.is_ascii_digit()) => (res.to_string(), id.to_string()),
    [.., res] => (res.to_string(), String::new()),
    [] => (String::new(), String::new()),
  }
}

fn decode<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
  // Some endpoints answer 204 / empty body; let `()`-like targets accept "null".
  let text = if text.trim().is_empty() { "null" } else { text };
  serde_json::from_str::<T>(text).map_err(|e| ApiError::Decode(format!("{e}; body: {}", trunc_for_log(text, 120))))
}
