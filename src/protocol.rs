//! Request/response bodies of the admin REST boundary (serde ready).
//! Entity bodies themselves are the `domain` structs.

use serde::{Deserialize, Serialize};

use crate::domain::{EntityId, VocabularyItem};
use crate::ordering::MoveDirection;

/// PATCH body for topics and content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PatchAction {
    MoveUp {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        topic_id: Option<EntityId>,
    },
    MoveDown {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        topic_id: Option<EntityId>,
    },
    ToggleVisibility,
}

impl PatchAction {
    pub fn topic_move(dir: MoveDirection, unit: &str) -> Self {
        let unit = Some(unit.to_string());
        match dir {
            MoveDirection::Up => PatchAction::MoveUp { unit, topic_id: None },
            MoveDirection::Down => PatchAction::MoveDown { unit, topic_id: None },
        }
    }

    pub fn content_move(dir: MoveDirection, topic_id: EntityId) -> Self {
        let topic_id = Some(topic_id);
        match dir {
            MoveDirection::Up => PatchAction::MoveUp { unit: None, topic_id },
            MoveDirection::Down => PatchAction::MoveDown { unit: None, topic_id },
        }
    }

    pub fn direction(&self) -> Option<MoveDirection> {
        match self {
            PatchAction::MoveUp { .. } => Some(MoveDirection::Up),
            PatchAction::MoveDown { .. } => Some(MoveDirection::Down),
            PatchAction::ToggleVisibility => None,
        }
    }
}

/// Body returned by POST; extra entity fields are ignored.
#[derive(Debug, Deserialize, Serialize)]
pub struct CreatedOut {
    pub id: EntityId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VocabularySearchIn {
    pub words: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularySearchOut {
    #[serde(default)]
    pub vocabulary_items: Vec<VocabularyItem>,
}

/// Error body shape used by the admin API (`{"error": "..."}`).
#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorOut {
    pub error: String,
}

/// Pull a readable message out of an error body, or fall back to the raw text.
pub fn extract_error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorOut>(body) {
        Ok(e) => e.error,
        Err(_) => body.trim().to_string(),
    }
}
