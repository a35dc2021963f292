//! Loading client configuration (API endpoint, retry policy, review settings) from TOML.
//!
//! See `StudioConfig` for the expected schema. Every field has a default, so an
//! empty file (or no file at all) is valid.

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize)]
pub struct StudioConfig {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub retry: RetryConfig,
  #[serde(default)]
  pub review: ReviewSettings,
  /// Curriculum track used when none is given ("Grapeseed", "TATH", "WSC", ...).
  #[serde(default = "default_program")]
  pub program: String,
}

fn default_program() -> String { "Grapeseed".into() }

impl Default for StudioConfig {
  fn default() -> Self {
    Self {
      api: ApiConfig::default(),
      retry: RetryConfig::default(),
      review: ReviewSettings::default(),
      program: default_program(),
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  pub base_url: String,
  pub timeout_secs: u64,
  pub user_agent: String,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: "http://localhost:3000".into(),
      timeout_secs: 20,
      user_agent: "lesson-studio/0.1".into(),
    }
  }
}

/// Bounded exponential backoff for transient failures.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
  pub max_attempts: u32,
  pub base_delay_ms: u64,
  pub max_delay_ms: u64,
}

impl Default for RetryConfig {
  fn default() -> Self { Self { max_attempts: 3, base_delay_ms: 200, max_delay_ms: 2_000 } }
}

impl RetryConfig {
  /// Delay before retry number `attempt` (1-based): base * 2^(attempt-1), capped.
  pub fn backoff(&self, attempt: u32) -> Duration {
    let factor = 1u64 << attempt.saturating_sub(1).min(16);
    Duration::from_millis(self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms))
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ReviewSettings {
  pub include_vocabulary: bool,
  pub include_questions: bool,
  pub shuffle: bool,
  /// Learners self-assess each item after revealing the answer.
  pub assessment_mode: bool,
  /// Pause between an assessment and the automatic move to the next item.
  pub advance_delay_ms: u64,
}

impl Default for ReviewSettings {
  fn default() -> Self {
    Self {
      include_vocabulary: true,
      include_questions: true,
      shuffle: true,
      assessment_mode: true,
      advance_delay_ms: 1_500,
    }
  }
}

impl ReviewSettings {
  pub fn advance_delay(&self) -> Duration { Duration::from_millis(self.advance_delay_ms) }
}

/// Load `StudioConfig` from STUDIO_CONFIG_PATH (defaults on any IO/parse error),
/// then apply STUDIO_API_BASE_URL / STUDIO_PROGRAM overrides.
pub fn load_config_from_env() -> StudioConfig {
  let mut cfg = match std::env::var("STUDIO_CONFIG_PATH") {
    Ok(path) => match std::fs::read_to_string(&path) {
      Ok(s) => match toml::from_str::<StudioConfig>(&s) {
        Ok(cfg) => {
          info!(target: "lesson_studio", %path, "Loaded studio config (TOML)");
          cfg
        }
        Err(e) => {
          error!(target: "lesson_studio", %path, error = %e, "Failed to parse TOML config; using defaults");
          StudioConfig::default()
        }
      },
      Err(e) => {
        error!(target: "lesson_studio", %path, error = %e, "Failed to read TOML config file; using defaults");
        StudioConfig::default()
      }
    },
    Err(_) => StudioConfig::default(),
  };

  if let Ok(url) = std::env::var("STUDIO_API_BASE_URL") { cfg.api.base_url = url; }
  if let Ok(program) = std::env::var("STUDIO_PROGRAM") { cfg.program = program; }
  cfg
}
