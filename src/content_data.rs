//! `ContentData`: the text/image/mixed value stored inside a single text column.
//!
//! Legacy rows hold plain text; newer rows hold a JSON-encoded tagged union.
//! Everything that reads or writes a question body, a choice body or a content
//! field goes through `parse` / `stringify` so the storage format lives here only.

use serde::{Deserialize, Serialize};

/// Tagged union stored as `{"type": "text"|"image"|"mixed", "text"?, "image"?}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
// A field foreign to the tagged variant (e.g. `image` on `text`) makes the
// value invalid, so `parse` keeps it as raw text.
#[serde(tag = "type", rename_all = "lowercase", deny_unknown_fields)]
pub enum ContentData {
  Text {
    #[serde(default)]
    text: String,
  },
  Image {
    #[serde(default)]
    image: String,
  },
  Mixed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image: Option<String>,
  },
}

impl Default for ContentData {
  fn default() -> Self { ContentData::Text { text: String::new() } }
}

impl ContentData {
  pub fn text(s: impl Into<String>) -> Self { ContentData::Text { text: s.into() } }

  pub fn image(url: impl Into<String>) -> Self { ContentData::Image { image: url.into() } }

  pub fn mixed(text: Option<String>, image: Option<String>) -> Self {
    ContentData::Mixed { text, image }
  }

  /// Decode a stored string. Never fails: anything that is not a recognised
  /// JSON union (including legacy plain text, and unions carrying fields their
  /// variant does not have) becomes `Text { text: raw }`.
  pub fn parse(raw: &str) -> Self {
    match serde_json::from_str::<ContentData>(raw) {
      Ok(data) => data,
      Err(_) => ContentData::Text { text: raw.to_string() },
    }
  }

  /// Encode for storage. Always JSON, so legacy plain text is upgraded on write.
  pub fn stringify(&self) -> String {
    serde_json::to_string(self).unwrap_or_else(|_| self.plain_text().to_string())
  }

  pub fn text_part(&self) -> Option<&str> {
    match self {
      ContentData::Text { text } => Some(text.as_str()),
      ContentData::Image { .. } => None,
      ContentData::Mixed { text, .. } => text.as_deref(),
    }
  }

  pub fn image_part(&self) -> Option<&str> {
    match self {
      ContentData::Text { .. } => None,
      ContentData::Image { image } => Some(image.as_str()),
      ContentData::Mixed { image, .. } => image.as_deref(),
    }
  }

  /// Text to show when only a string can be rendered (empty for image-only).
  pub fn plain_text(&self) -> &str { self.text_part().unwrap_or("") }

  /// True when neither a non-blank text nor a non-blank image is present.
  pub fn is_empty(&self) -> bool {
    let blank = |s: Option<&str>| s.map_or(true, |v| v.trim().is_empty());
    blank(self.text_part()) && blank(self.image_part())
  }
}
