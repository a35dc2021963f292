//! Lesson Studio · admin core for a curriculum of topics, content items,
//! questions and vocabulary.
//!
//! - Typed services over the admin REST API (`services`, `api`)
//! - Catalog store with lazy unit/topic expansion and ordering (`store`)
//! - Overlay (dialog) state and the review/quiz player (`overlay`, `review`)
//!
//! Important env variables:
//!   STUDIO_CONFIG_PATH  : path to TOML config (built-in defaults when unset)
//!   STUDIO_API_BASE_URL : overrides `[api] base_url`
//!   STUDIO_PROGRAM      : overrides `program`
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

pub mod api;
pub mod config;
pub mod content_data;
pub mod domain;
pub mod error;
pub mod ordering;
pub mod overlay;
pub mod protocol;
pub mod review;
pub mod services;
pub mod store;
pub mod telemetry;
pub mod util;

#[cfg(test)]
mod mock_api;

pub use api::ApiClient;
pub use config::StudioConfig;
pub use error::ApiError;
pub use services::Services;
pub use store::CatalogStore;
