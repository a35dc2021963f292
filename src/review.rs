//! Review/quiz player.
//!
//! A session is a fixed sequence of vocabulary entries and questions, shuffled
//! once when it starts. Each item walks
//! hidden -> content revealed -> answer revealed -> assessed, and a correct or
//! incorrect assessment schedules the move to the next item. Assessing the last
//! item completes the session.
//!
//! Navigating with `next`/`prev` lands on an item with fresh reveal state; the
//! recorded results of other items are kept.

use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::ReviewSettings;
use crate::content_data::ContentData;
use crate::domain::{Content, Question, QuestionType, VocabularyItem};
use crate::error::ApiError;
use crate::services::VocabularyService;
use crate::util::split_word_list;

const SLOT_LABELS: [char; 4] = ['A', 'B', 'C', 'D'];

#[derive(Clone, Debug, PartialEq)]
pub enum ReviewItem {
  Vocabulary(VocabularyItem),
  Question(Question),
}

impl ReviewItem {
  /// What is shown once the content is revealed.
  pub fn prompt(&self) -> ContentData {
    match self {
      ReviewItem::Vocabulary(v) => ContentData::text(v.word.clone()),
      ReviewItem::Question(q) => q.body(),
    }
  }

  /// What is shown once the answer is revealed: the definition, or the
  /// correct choice / free-text answer followed by the explanation.
  pub fn answer(&self) -> String {
    match self {
      ReviewItem::Vocabulary(v) => {
        if v.example.is_empty() { v.definition.clone() } else { format!("{}\n{}", v.definition, v.example) }
      }
      ReviewItem::Question(q) => {
        let answer = match q.question_type {
          QuestionType::MultipleChoice => choice_slots(q)
            .into_iter()
            .find(|s| s.correct)
            .map(|s| format!("{}. {}", s.label, s.data.plain_text()))
            .unwrap_or_default(),
          _ => q.answer.clone(),
        };
        if q.explanation.is_empty() { answer } else { format!("{answer}\n{}", q.explanation) }
      }
    }
  }
}

/// One rendered multiple-choice option.
#[derive(Clone, Debug, PartialEq)]
pub struct ChoiceSlot {
  pub label: char,
  pub slot: usize,
  pub data: ContentData,
  pub correct: bool,
}

/// The A-D slots of a question, leaving out empty choices. Labels stay tied
/// to their slot, so an empty B leaves A and C, not A and B.
pub fn choice_slots(q: &Question) -> Vec<ChoiceSlot> {
  let correct = q.correct_slot();
  q.choices()
    .into_iter()
    .enumerate()
    .filter(|(_, data)| !data.is_empty())
    .map(|(slot, data)| ChoiceSlot { label: SLOT_LABELS[slot], slot, data, correct: correct == Some(slot) })
    .collect()
}

/// Words listed in a content item's `infor1`.
pub fn vocabulary_words(content: &Content) -> Vec<String> { split_word_list(&content.infor1) }

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
  ContentHidden,
  ContentRevealed,
  AnswerRevealed,
  Assessed { correct: bool },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReviewEvent {
  /// Move to the next item after this pause.
  AdvanceAfter(Duration),
  /// The last item was assessed; the session is over.
  Complete,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReviewError {
  #[error("cannot {action} while in {from:?}")]
  InvalidTransition { from: Phase, action: &'static str },
  #[error("session is not in assessment mode")]
  NotAssessing,
  #[error("review session is finished")]
  Finished,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReviewSummary {
  pub total: usize,
  pub answered: usize,
  pub correct: usize,
}

#[derive(Clone, Debug)]
pub struct ReviewSession {
  pub id: Uuid,
  items: Vec<ReviewItem>,
  index: usize,
  phase: Phase,
  results: Vec<Option<bool>>,
  assessment_mode: bool,
  advance_delay: Duration,
  finished: bool,
}

impl ReviewSession {
  pub fn new(items: Vec<ReviewItem>, settings: &ReviewSettings) -> Self {
    Self::with_rng(items, settings, &mut rand::thread_rng())
  }

  pub fn with_rng<R: Rng + ?Sized>(mut items: Vec<ReviewItem>, settings: &ReviewSettings, rng: &mut R) -> Self {
    if settings.shuffle {
      items.shuffle(rng);
    }
    let n = items.len();
    Self {
      id: Uuid::new_v4(),
      items,
      index: 0,
      phase: Phase::ContentHidden,
      results: vec![None; n],
      assessment_mode: settings.assessment_mode,
      advance_delay: settings.advance_delay(),
      finished: n == 0,
    }
  }

  pub fn items(&self) -> &[ReviewItem] { &self.items }

  pub fn len(&self) -> usize { self.items.len() }

  pub fn is_empty(&self) -> bool { self.items.is_empty() }

  pub fn index(&self) -> usize { self.index }

  pub fn phase(&self) -> Phase { self.phase }

  pub fn is_finished(&self) -> bool { self.finished }

  pub fn current(&self) -> Option<&ReviewItem> {
    if self.finished { None } else { self.items.get(self.index) }
  }

  fn ensure_active(&self) -> Result<(), ReviewError> {
    if self.finished { Err(ReviewError::Finished) } else { Ok(()) }
  }

  pub fn reveal_content(&mut self) -> Result<(), ReviewError> {
    self.ensure_active()?;
    match self.phase {
      Phase::ContentHidden => {
        self.phase = Phase::ContentRevealed;
        Ok(())
      }
      from => Err(ReviewError::InvalidTransition { from, action: "reveal content" }),
    }
  }

  pub fn reveal_answer(&mut self) -> Result<(), ReviewError> {
    self.ensure_active()?;
    match self.phase {
      Phase::ContentRevealed => {
        self.phase = Phase::AnswerRevealed;
        Ok(())
      }
      from => Err(ReviewError::InvalidTransition { from, action: "reveal answer" }),
    }
  }

  /// Show or hide the answer again without assessing.
  pub fn toggle_answer(&mut self) -> Result<(), ReviewError> {
    self.ensure_active()?;
    match self.phase {
      Phase::ContentRevealed => self.phase = Phase::AnswerRevealed,
      Phase::AnswerRevealed => self.phase = Phase::ContentRevealed,
      from => return Err(ReviewError::InvalidTransition { from, action: "toggle answer" }),
    }
    Ok(())
  }

  /// Record a self-assessment. Only valid once the answer is showing.
  #[instrument(level = "debug", skip(self), fields(session = %self.id, index = self.index))]
  pub fn assess(&mut self, correct: bool) -> Result<ReviewEvent, ReviewError> {
    self.ensure_active()?;
    if !self.assessment_mode {
      return Err(ReviewError::NotAssessing);
    }
    if self.phase != Phase::AnswerRevealed {
      return Err(ReviewError::InvalidTransition { from: self.phase, action: "assess" });
    }
    self.results[self.index] = Some(correct);
    self.phase = Phase::Assessed { correct };

    if self.index + 1 >= self.items.len() {
      self.finished = true;
      let summary = self.summary();
      info!(target: "review", session = %self.id, total = summary.total, answered = summary.answered, correct = summary.correct, "Review complete");
      return Ok(ReviewEvent::Complete);
    }
    Ok(ReviewEvent::AdvanceAfter(self.advance_delay))
  }

  /// `assess`, then wait out the pause and move on.
  pub async fn assess_and_advance(&mut self, correct: bool) -> Result<ReviewEvent, ReviewError> {
    let event = self.assess(correct)?;
    if let ReviewEvent::AdvanceAfter(delay) = event {
      tokio::time::sleep(delay).await;
      // A manual navigation can't interleave here: we hold `&mut self`.
      self.next()?;
    }
    Ok(event)
  }

  /// Move to the next item. Returns `false` (and stays put) on the last one.
  pub fn next(&mut self) -> Result<bool, ReviewError> {
    self.ensure_active()?;
    if self.index + 1 >= self.items.len() {
      return Ok(false);
    }
    self.land(self.index + 1);
    Ok(true)
  }

  pub fn prev(&mut self) -> Result<bool, ReviewError> {
    self.ensure_active()?;
    if self.index == 0 {
      return Ok(false);
    }
    self.land(self.index - 1);
    Ok(true)
  }

  fn land(&mut self, index: usize) {
    self.index = index;
    self.phase = Phase::ContentHidden;
    debug!(target: "review", session = %self.id, index, "Moved to item");
  }

  pub fn result(&self, index: usize) -> Option<bool> { self.results.get(index).copied().flatten() }

  pub fn summary(&self) -> ReviewSummary {
    ReviewSummary {
      total: self.items.len(),
      answered: self.results.iter().filter(|r| r.is_some()).count(),
      correct: self.results.iter().filter(|r| **r == Some(true)).count(),
    }
  }
}

/// Assemble a session for a content item: vocabulary looked up from the words
/// in `infor1` and/or the given questions, per settings.
#[instrument(level = "info", skip_all, fields(content_id = content.id, questions = questions.len()))]
pub async fn build_session(
  content: &Content,
  questions: &[Question],
  vocabulary: &VocabularyService,
  settings: &ReviewSettings,
) -> Result<ReviewSession, ApiError> {
  let mut items = Vec::new();
  if settings.include_vocabulary {
    let words = vocabulary_words(content);
    let found = vocabulary.search(&words).await?;
    items.extend(found.into_iter().map(ReviewItem::Vocabulary));
  }
  if settings.include_questions {
    items.extend(questions.iter().cloned().map(ReviewItem::Question));
  }
  let session = ReviewSession::new(items, settings);
  info!(target: "review", session = %session.id, items = session.len(), "Review session built");
  Ok(session)
}
