//! Which admin dialog is open, and with what payload.
//!
//! A single enum value replaces the usual pile of `is_x_open` / `selected_x`
//! flags: opening any dialog replaces whatever was open before, so at most one
//! overlay is ever active.

use tracing::debug;

use crate::domain::{Content, EntityId, Question, Topic};

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Overlay {
  #[default]
  None,
  TopicForm { editing: Option<Topic> },
  ContentForm { editing: Option<Content>, topic_id: Option<EntityId> },
  QuizGenerator { content_id: EntityId, title: String },
  ContentGenerator { topic_id: EntityId, name: String, summary: String },
  QuestionView { question: Question },
  ContentView { content: Content },
  ContentQuestions { content: Content },
  ManualQuestionForm { content: Content, editing: Option<Question> },
}

impl Overlay {
  pub fn name(&self) -> &'static str {
    match self {
      Overlay::None => "none",
      Overlay::TopicForm { .. } => "topic_form",
      Overlay::ContentForm { .. } => "content_form",
      Overlay::QuizGenerator { .. } => "quiz_generator",
      Overlay::ContentGenerator { .. } => "content_generator",
      Overlay::QuestionView { .. } => "question_view",
      Overlay::ContentView { .. } => "content_view",
      Overlay::ContentQuestions { .. } => "content_questions",
      Overlay::ManualQuestionForm { .. } => "manual_question_form",
    }
  }
}

#[derive(Clone, Debug, Default)]
pub struct OverlayState {
  current: Overlay,
}

impl OverlayState {
  pub fn new() -> Self { Self::default() }

  pub fn current(&self) -> &Overlay { &self.current }

  pub fn is_open(&self) -> bool { self.current != Overlay::None }

  fn open(&mut self, next: Overlay) {
    if self.is_open() {
      debug!(target: "lesson_studio", from = self.current.name(), to = next.name(), "Replacing open overlay");
    }
    self.current = next;
  }

  /// `None` opens the form for a new topic.
  pub fn open_topic_form(&mut self, editing: Option<Topic>) {
    self.open(Overlay::TopicForm { editing });
  }

  /// Editing takes its topic from the content; a new item needs `topic_id`.
  pub fn open_content_form(&mut self, editing: Option<Content>, topic_id: Option<EntityId>) {
    let topic_id = editing.as_ref().map(|c| c.topicid).or(topic_id);
    self.open(Overlay::ContentForm { editing, topic_id });
  }

  pub fn open_quiz_generator(&mut self, content: &Content) {
    self.open(Overlay::QuizGenerator { content_id: content.id, title: content.title.clone() });
  }

  pub fn open_content_generator(&mut self, topic: &Topic) {
    self.open(Overlay::ContentGenerator {
      topic_id: topic.id,
      name: topic.name.clone(),
      summary: topic.short_summary.clone(),
    });
  }

  pub fn open_question_view(&mut self, question: Question) {
    self.open(Overlay::QuestionView { question });
  }

  pub fn open_content_view(&mut self, content: Content) {
    self.open(Overlay::ContentView { content });
  }

  pub fn open_content_questions(&mut self, content: Content) {
    self.open(Overlay::ContentQuestions { content });
  }

  pub fn open_manual_question(&mut self, content: Content, editing: Option<Question>) {
    self.open(Overlay::ManualQuestionForm { content, editing });
  }

  /// Close whatever is open and drop its payload. Returns what was closed.
  pub fn close(&mut self) -> Overlay {
    std::mem::take(&mut self.current)
  }
}
