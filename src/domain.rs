//! Domain models: topics, content items, questions, vocabulary, and the drafts
//! sent when creating or updating them.

use serde::{Deserialize, Serialize};

use crate::content_data::ContentData;
use crate::error::ApiError;
use crate::ordering::{Ordered, Visible};

pub type EntityId = i64;

/// Curriculum topic, grouped by `unit` within a `program`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Topic {
  pub id: EntityId,
  #[serde(rename = "topic")]
  pub name: String,
  #[serde(default)] pub short_summary: String,
  #[serde(default)] pub unit: String,
  #[serde(default)] pub program: String,
  #[serde(default)] pub parentid: Option<EntityId>,
  // Older rows carry `showstudent`; `visible` wins when both are set.
  #[serde(default, skip_serializing_if = "Option::is_none")] pub showstudent: Option<bool>,
  #[serde(default)] pub visible: Option<bool>,
  #[serde(default)] pub order_index: Option<i64>,
}

/// Lesson/activity item owned by a topic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Content {
  pub id: EntityId,
  pub title: String,
  /// Description text; doubles as the vocabulary word list in review mode.
  #[serde(default)] pub infor1: String,
  #[serde(default)] pub infor2: String,
  #[serde(default)] pub image1: Option<String>,
  #[serde(default)] pub image2: Option<String>,
  #[serde(default)] pub video1: Option<String>,
  #[serde(default)] pub video2: Option<String>,
  pub topicid: EntityId,
  #[serde(default)] pub visible: Option<bool>,
  #[serde(default)] pub order_index: Option<i64>,
  #[serde(default)] pub question_count: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuestionType {
  MultipleChoice,
  Text,
  Other(String),
}

impl From<String> for QuestionType {
  fn from(s: String) -> Self {
    match s.as_str() {
      "multiple_choice" => QuestionType::MultipleChoice,
      "text" => QuestionType::Text,
      _ => QuestionType::Other(s),
    }
  }
}

impl From<QuestionType> for String {
  fn from(t: QuestionType) -> Self {
    match t {
      QuestionType::MultipleChoice => "multiple_choice".into(),
      QuestionType::Text => "text".into(),
      QuestionType::Other(s) => s,
    }
  }
}

/// Quiz item owned by a content item. Body and choices are `ContentData`-encoded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Question {
  pub id: EntityId,
  #[serde(default)] pub program: String,
  #[serde(default)] pub level: String,
  pub contentid: EntityId,
  pub question_type: QuestionType,
  #[serde(default)] pub question: String,
  #[serde(default)] pub choice1: String,
  #[serde(default)] pub choice2: String,
  #[serde(default)] pub choice3: String,
  #[serde(default)] pub choice4: String,
  #[serde(default)] pub correct_choice: String,
  #[serde(default)] pub answer: String,
  #[serde(default)] pub explanation: String,
  #[serde(default)] pub time: Option<i64>,
  #[serde(default)] pub video: Option<String>,
  #[serde(default)] pub picture: Option<String>,
}

impl Question {
  pub fn body(&self) -> ContentData { ContentData::parse(&self.question) }

  pub fn choices(&self) -> [ContentData; 4] {
    [&self.choice1, &self.choice2, &self.choice3, &self.choice4].map(|c| ContentData::parse(c))
  }

  /// Zero-based slot named by `correct_choice` ("1".."4" or "A".."D").
  pub fn correct_slot(&self) -> Option<usize> { parse_choice_ref(&self.correct_choice) }
}

/// Word entry looked up by the words listed in a content's `infor1`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VocabularyItem {
  pub id: EntityId,
  pub word: String,
  #[serde(default)] pub part_of_speech: String,
  #[serde(default)] pub definition: String,
  #[serde(default)] pub example: String,
  #[serde(default)] pub phonetic: String,
  #[serde(default)] pub image_url: Option<String>,
  #[serde(default)] pub video_url: Option<String>,
  #[serde(default)] pub tags: Vec<String>,
}

/// Topics of one unit, as returned by the by-unit outline endpoint. An empty
/// `topics` list is a placeholder that is filled when the unit is expanded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitGroup {
  pub unit: String,
  #[serde(default)] pub topics: Vec<Topic>,
}

impl UnitGroup {
  pub fn is_placeholder(&self) -> bool { self.topics.is_empty() }
}

//
// Drafts (create/update payloads)
//

#[derive(Clone, Debug, Default, Serialize)]
pub struct TopicDraft {
  #[serde(rename = "topic")]
  pub name: String,
  pub short_summary: String,
  pub unit: String,
  pub program: String,
  #[serde(skip_serializing_if = "Option::is_none")] pub parentid: Option<EntityId>,
  #[serde(skip_serializing_if = "Option::is_none")] pub visible: Option<bool>,
}

impl TopicDraft {
  pub fn validate(&self) -> Result<(), ApiError> {
    if self.name.trim().is_empty() {
      return Err(ApiError::Validation("topic name is required".into()));
    }
    if self.unit.trim().is_empty() {
      return Err(ApiError::Validation("topic unit is required".into()));
    }
    Ok(())
  }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ContentDraft {
  pub title: String,
  pub infor1: String,
  pub infor2: String,
  #[serde(skip_serializing_if = "Option::is_none")] pub image1: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")] pub image2: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")] pub video1: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")] pub video2: Option<String>,
  pub topicid: EntityId,
  #[serde(skip_serializing_if = "Option::is_none")] pub visible: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")] pub question_count: Option<i64>,
}

impl ContentDraft {
  pub fn validate(&self) -> Result<(), ApiError> {
    if self.title.trim().is_empty() {
      return Err(ApiError::Validation("content title is required".into()));
    }
    Ok(())
  }
}

impl From<&Content> for ContentDraft {
  fn from(c: &Content) -> Self {
    Self {
      title: c.title.clone(),
      infor1: c.infor1.clone(),
      infor2: c.infor2.clone(),
      image1: c.image1.clone(),
      image2: c.image2.clone(),
      video1: c.video1.clone(),
      video2: c.video2.clone(),
      topicid: c.topicid,
      visible: c.visible,
      question_count: Some(c.question_count),
    }
  }
}

#[derive(Clone, Debug, Serialize)]
pub struct QuestionDraft {
  pub program: String,
  pub level: String,
  pub contentid: EntityId,
  pub question_type: QuestionType,
  pub question: String,
  pub choice1: String,
  pub choice2: String,
  pub choice3: String,
  pub choice4: String,
  pub correct_choice: String,
  pub answer: String,
  pub explanation: String,
  #[serde(skip_serializing_if = "Option::is_none")] pub time: Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")] pub video: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")] pub picture: Option<String>,
}

impl QuestionDraft {
  /// Multiple choice needs two non-empty choices and a correct choice that
  /// points at one of them; text questions need an answer.
  pub fn validate(&self) -> Result<(), ApiError> {
    if ContentData::parse(&self.question).is_empty() {
      return Err(ApiError::Validation("question body is required".into()));
    }
    match self.question_type {
      QuestionType::MultipleChoice => {
        let choices = [&self.choice1, &self.choice2, &self.choice3, &self.choice4]
          .map(|c| ContentData::parse(c));
        let filled = choices.iter().filter(|c| !c.is_empty()).count();
        if filled < 2 {
          return Err(ApiError::Validation("multiple choice needs at least two choices".into()));
        }
        match parse_choice_ref(&self.correct_choice) {
          Some(slot) if !choices[slot].is_empty() => Ok(()),
          Some(_) => Err(ApiError::Validation(format!(
            "correct choice '{}' points at an empty choice",
            self.correct_choice
          ))),
          None => Err(ApiError::Validation(format!(
            "correct choice '{}' is not one of 1-4 or A-D",
            self.correct_choice
          ))),
        }
      }
      QuestionType::Text => {
        if self.answer.trim().is_empty() {
          Err(ApiError::Validation("text question needs an answer".into()))
        } else {
          Ok(())
        }
      }
      QuestionType::Other(_) => Ok(()),
    }
  }
}

impl From<&Question> for QuestionDraft {
  fn from(q: &Question) -> Self {
    Self {
      program: q.program.clone(),
      level: q.level.clone(),
      contentid: q.contentid,
      question_type: q.question_type.clone(),
      question: q.question.clone(),
      choice1: q.choice1.clone(),
      choice2: q.choice2.clone(),
      choice3: q.choice3.clone(),
      choice4: q.choice4.clone(),
      correct_choice: q.correct_choice.clone(),
      answer: q.answer.clone(),
      explanation: q.explanation.clone(),
      time: q.time,
      video: q.video.clone(),
      picture: q.picture.clone(),
    }
  }
}

/// "1".."4" or "A".."D" (any case) to a zero-based slot.
pub fn parse_choice_ref(s: &str) -> Option<usize> {
  match s.trim().to_ascii_uppercase().as_str() {
    "1" | "A" => Some(0),
    "2" | "B" => Some(1),
    "3" | "C" => Some(2),
    "4" | "D" => Some(3),
    _ => None,
  }
}

impl Ordered for Topic {
  fn order_index(&self) -> Option<i64> { self.order_index }
  fn set_order_index(&mut self, idx: Option<i64>) { self.order_index = idx; }
}
impl Visible for Topic {
  fn visible(&self) -> Option<bool> { self.visible.or(self.showstudent) }
  fn set_visible(&mut self, v: bool) {
    self.visible = Some(v);
    if self.showstudent.is_some() { self.showstudent = Some(v); }
  }
}

impl Ordered for Content {
  fn order_index(&self) -> Option<i64> { self.order_index }
  fn set_order_index(&mut self, idx: Option<i64>) { self.order_index = idx; }
}
impl Visible for Content {
  fn visible(&self) -> Option<bool> { self.visible }
  fn set_visible(&mut self, v: bool) { self.visible = Some(v); }
}
