//! Session catalog store: the lazily-filled Topic/Content/Question tree.
//!
//! This module owns:
//!   - the unit outline (placeholder groups filled on unit expansion)
//!   - the flat content list, deduplicated by id, and the set of loaded topics
//!   - questions per content, loaded on demand
//!   - the single expanded unit and the single expanded topic
//!
//! A fetch started by an expansion is tied to a cancellation token. Collapsing,
//! or expanding something else, cancels it, and a cancelled fetch never writes
//! into the store. Failed topic loads are not marked as loaded, so the next
//! expansion tries again.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{OnceCell, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::domain::{Content, EntityId, Question, Topic, UnitGroup};
use crate::error::ApiError;
use crate::ordering::{filter_visible, sort_by_order_index, swap_with_neighbor, toggled_visibility, MoveDirection, Visible};
use crate::services::content::DEFAULT_PAGE_LIMIT;
use crate::services::topics::TopicFilter;
use crate::services::Services;

/// What the store needs from the outside world.
#[allow(async_fn_in_trait)]
pub trait CatalogSource {
  async fn unit_outline(&self, program: &str) -> Result<Vec<UnitGroup>, ApiError>;
  async fn unit_topics(&self, program: &str, unit: &str) -> Result<Vec<Topic>, ApiError>;
  async fn topic_content(&self, topic_id: EntityId) -> Result<Vec<Content>, ApiError>;
  async fn all_content(&self) -> Result<Vec<Content>, ApiError>;
  async fn content_questions(&self, content_id: EntityId) -> Result<Vec<Question>, ApiError>;

  async fn move_topic(&self, id: EntityId, dir: MoveDirection, unit: &str) -> Result<(), ApiError>;
  async fn move_content(&self, id: EntityId, dir: MoveDirection, topic_id: EntityId) -> Result<(), ApiError>;
  async fn toggle_topic(&self, id: EntityId) -> Result<(), ApiError>;
  async fn toggle_content(&self, id: EntityId) -> Result<(), ApiError>;
  async fn remove_topic(&self, id: EntityId) -> Result<(), ApiError>;
  async fn remove_content(&self, id: EntityId) -> Result<(), ApiError>;
}

impl CatalogSource for Services {
  async fn unit_outline(&self, program: &str) -> Result<Vec<UnitGroup>, ApiError> {
    self.topics.by_unit(program, None).await
  }

  async fn unit_topics(&self, program: &str, unit: &str) -> Result<Vec<Topic>, ApiError> {
    let groups = self.topics.by_unit(program, Some(unit)).await?;
    match groups.into_iter().find(|g| g.unit == unit) {
      Some(g) => Ok(g.topics),
      // Older servers ignore the unit filter on by-unit; fall back to the admin list.
      None => {
        let filter = TopicFilter { program: Some(program.to_string()), unit: Some(unit.to_string()) };
        self.topics.list(&filter).await
      }
    }
  }

  async fn topic_content(&self, topic_id: EntityId) -> Result<Vec<Content>, ApiError> {
    self.content.list_for_topics(&[topic_id], DEFAULT_PAGE_LIMIT).await
  }

  async fn all_content(&self) -> Result<Vec<Content>, ApiError> { self.content.list().await }

  async fn content_questions(&self, content_id: EntityId) -> Result<Vec<Question>, ApiError> {
    self.questions.list_for_content(content_id).await
  }

  async fn move_topic(&self, id: EntityId, dir: MoveDirection, unit: &str) -> Result<(), ApiError> {
    self.topics.move_topic(id, dir, unit).await
  }

  async fn move_content(&self, id: EntityId, dir: MoveDirection, topic_id: EntityId) -> Result<(), ApiError> {
    self.content.move_content(id, dir, topic_id).await
  }

  async fn toggle_topic(&self, id: EntityId) -> Result<(), ApiError> { self.topics.toggle_visibility(id).await }

  async fn toggle_content(&self, id: EntityId) -> Result<(), ApiError> { self.content.toggle_visibility(id).await }

  async fn remove_topic(&self, id: EntityId) -> Result<(), ApiError> { self.topics.remove(id).await }

  async fn remove_content(&self, id: EntityId) -> Result<(), ApiError> { self.content.remove(id).await }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExpandOutcome {
  Collapsed,
  Expanded { fetched: bool },
  /// Another expand/collapse happened while the fetch was in flight; nothing was stored.
  Superseded,
}

#[derive(Clone, Debug, Default)]
pub struct CatalogState {
  pub program: String,
  pub unit_groups: Vec<UnitGroup>,
  pub content: Vec<Content>,
  pub loaded_topic_ids: HashSet<EntityId>,
  pub questions: HashMap<EntityId, Vec<Question>>,
  pub expanded_unit: Option<String>,
  pub expanded_topic: Option<EntityId>,
  unit_fetch: Option<CancellationToken>,
  topic_fetch: Option<CancellationToken>,
  question_loads: HashMap<EntityId, Arc<OnceCell<Vec<Question>>>>,
}

impl CatalogState {
  pub fn topic(&self, id: EntityId) -> Option<&Topic> {
    self.unit_groups.iter().flat_map(|g| g.topics.iter()).find(|t| t.id == id)
  }

  /// Content of a topic in display order.
  pub fn content_of(&self, topic_id: EntityId) -> Vec<Content> {
    let mut rows: Vec<Content> = self.content.iter().filter(|c| c.topicid == topic_id).cloned().collect();
    sort_by_order_index(&mut rows);
    rows
  }

  /// Cancel the in-flight unit fetch. Returns whether one was running.
  fn cancel_unit_fetch(&mut self) -> bool {
    match self.unit_fetch.take() {
      Some(t) => {
        t.cancel();
        true
      }
      None => false,
    }
  }

  fn cancel_topic_fetch(&mut self) -> bool {
    match self.topic_fetch.take() {
      Some(t) => {
        t.cancel();
        true
      }
      None => false,
    }
  }

  /// Collapse the expanded topic if it belongs to `unit`.
  fn collapse_topic_in(&mut self, unit: &str) {
    let in_unit = self.expanded_topic.and_then(|id| self.topic(id)).map_or(false, |t| t.unit == unit);
    if in_unit {
      self.cancel_topic_fetch();
      self.expanded_topic = None;
    }
  }

  fn merge_content(&mut self, rows: Vec<Content>) -> usize {
    let mut added = 0;
    for row in rows {
      match self.content.iter_mut().find(|c| c.id == row.id) {
        Some(existing) => *existing = row,
        None => {
          self.content.push(row);
          added += 1;
        }
      }
    }
    added
  }
}

/// Shared handle; clones see the same state.
pub struct CatalogStore<S> {
  source: Arc<S>,
  state: Arc<RwLock<CatalogState>>,
}

impl<S> Clone for CatalogStore<S> {
  fn clone(&self) -> Self {
    Self { source: self.source.clone(), state: self.state.clone() }
  }
}

impl<S: CatalogSource> CatalogStore<S> {
  pub fn new(source: S) -> Self {
    Self { source: Arc::new(source), state: Arc::new(RwLock::new(CatalogState::default())) }
  }

  pub fn source(&self) -> &S { &self.source }

  /// Copy of the current state, for rendering.
  pub async fn snapshot(&self) -> CatalogState { self.state.read().await.clone() }

  pub async fn expanded_unit(&self) -> Option<String> { self.state.read().await.expanded_unit.clone() }

  pub async fn expanded_topic(&self) -> Option<EntityId> { self.state.read().await.expanded_topic }

  pub async fn content_of(&self, topic_id: EntityId) -> Vec<Content> { self.state.read().await.content_of(topic_id) }

  pub async fn visible_content_of(&self, topic_id: EntityId) -> Vec<Content> {
    filter_visible(&self.state.read().await.content_of(topic_id))
  }

  pub async fn topics_of(&self, unit: &str) -> Vec<Topic> {
    let st = self.state.read().await;
    let mut topics = st.unit_groups.iter().find(|g| g.unit == unit).map(|g| g.topics.clone()).unwrap_or_default();
    sort_by_order_index(&mut topics);
    topics
  }

  /// Load the unit outline for a program. Expansions are reset; cached content is kept.
  #[instrument(level = "info", skip(self), fields(%program))]
  pub async fn load_outline(&self, program: &str) -> Result<Vec<UnitGroup>, ApiError> {
    let groups = self.source.unit_outline(program).await?;
    let mut st = self.state.write().await;
    st.program = program.to_string();
    st.unit_groups = groups.clone();
    st.cancel_unit_fetch();
    st.expanded_unit = None;
    info!(target: "catalog", units = groups.len(), "Unit outline loaded");
    Ok(groups)
  }

  /// Toggle a unit. Expanding replaces any other expanded unit and fills the
  /// unit's topics if it is still a placeholder. Collapsing or leaving a unit
  /// also collapses its expanded topic and cancels that topic's fetch.
  ///
  /// If the topic fetch fails, the previous expansion is restored and the
  /// error is returned.
  #[instrument(level = "info", skip(self), fields(%unit))]
  pub async fn expand_unit(&self, unit: &str) -> Result<ExpandOutcome, ApiError> {
    let (token, program, previous) = {
      let mut st = self.state.write().await;
      let was_fetching = st.cancel_unit_fetch();
      if st.expanded_unit.as_deref() == Some(unit) {
        st.expanded_unit = None;
        st.collapse_topic_in(unit);
        debug!(target: "catalog", %unit, "Unit collapsed");
        return Ok(ExpandOutcome::Collapsed);
      }
      let previous = if was_fetching { None } else { st.expanded_unit.take() };
      st.expanded_unit = Some(unit.to_string());
      let needs_fetch = st.unit_groups.iter().find(|g| g.unit == unit).map_or(true, UnitGroup::is_placeholder);
      if !needs_fetch {
        if let Some(old) = previous {
          st.collapse_topic_in(&old);
        }
        return Ok(ExpandOutcome::Expanded { fetched: false });
      }
      let token = CancellationToken::new();
      st.unit_fetch = Some(token.clone());
      (token, st.program.clone(), previous)
    };

    let res = tokio::select! {
      _ = token.cancelled() => {
        debug!(target: "catalog", %unit, "Unit fetch superseded");
        return Ok(ExpandOutcome::Superseded);
      }
      res = self.source.unit_topics(&program, unit) => res,
    };

    let mut st = self.state.write().await;
    if token.is_cancelled() {
      return Ok(ExpandOutcome::Superseded);
    }
    st.unit_fetch = None;
    let mut topics = match res {
      Ok(topics) => topics,
      Err(e) => {
        warn!(target: "catalog", %unit, error = %e, "Unit topics failed to load; expansion reverted");
        st.expanded_unit = previous;
        return Err(e);
      }
    };
    if let Some(old) = previous {
      st.collapse_topic_in(&old);
    }
    sort_by_order_index(&mut topics);
    let count = topics.len();
    match st.unit_groups.iter_mut().find(|g| g.unit == unit) {
      Some(group) => group.topics = topics,
      None => st.unit_groups.push(UnitGroup { unit: unit.to_string(), topics }),
    }
    info!(target: "catalog", %unit, topics = count, "Unit topics loaded");
    Ok(ExpandOutcome::Expanded { fetched: true })
  }

  /// Toggle a topic. Expanding replaces any other expanded topic and loads the
  /// topic's content once per session (empty results count as loaded).
  ///
  /// When both the scoped and the full fetch fail, the previous expansion is
  /// restored, the topic stays unloaded, and the error is returned.
  #[instrument(level = "info", skip(self))]
  pub async fn expand_topic(&self, topic_id: EntityId) -> Result<ExpandOutcome, ApiError> {
    let (token, previous) = {
      let mut st = self.state.write().await;
      let was_fetching = st.cancel_topic_fetch();
      if st.expanded_topic == Some(topic_id) {
        st.expanded_topic = None;
        debug!(target: "catalog", topic_id, "Topic collapsed");
        return Ok(ExpandOutcome::Collapsed);
      }
      // A topic whose own fetch was just cancelled has nothing to show.
      let previous = if was_fetching { None } else { st.expanded_topic };
      st.expanded_topic = Some(topic_id);
      let cached = st.loaded_topic_ids.contains(&topic_id) || st.content.iter().any(|c| c.topicid == topic_id);
      if cached {
        return Ok(ExpandOutcome::Expanded { fetched: false });
      }
      let token = CancellationToken::new();
      st.topic_fetch = Some(token.clone());
      (token, previous)
    };

    let res = tokio::select! {
      _ = token.cancelled() => {
        debug!(target: "catalog", topic_id, "Topic fetch superseded");
        return Ok(ExpandOutcome::Superseded);
      }
      res = self.fetch_topic_content(topic_id) => res,
    };

    let mut st = self.state.write().await;
    if token.is_cancelled() {
      return Ok(ExpandOutcome::Superseded);
    }
    st.topic_fetch = None;
    let rows = match res {
      Ok(rows) => rows,
      Err(e) => {
        st.expanded_topic = previous;
        return Err(e);
      }
    };
    let added = st.merge_content(rows);
    st.loaded_topic_ids.insert(topic_id);
    info!(target: "catalog", topic_id, added, "Topic content loaded");
    Ok(ExpandOutcome::Expanded { fetched: true })
  }

  /// Scoped fetch, falling back to a full fetch filtered client-side.
  async fn fetch_topic_content(&self, topic_id: EntityId) -> Result<Vec<Content>, ApiError> {
    match self.source.topic_content(topic_id).await {
      Ok(rows) => Ok(rows.into_iter().filter(|c| c.topicid == topic_id).collect()),
      Err(primary) => {
        warn!(target: "catalog", topic_id, error = %primary, "Scoped content fetch failed; trying full fetch");
        match self.source.all_content().await {
          Ok(all) => Ok(all.into_iter().filter(|c| c.topicid == topic_id).collect()),
          Err(fallback) => {
            warn!(target: "catalog", topic_id, error = %fallback, "Full content fetch failed too");
            Err(primary)
          }
        }
      }
    }
  }

  /// Questions of a content item, fetched once per session. Concurrent
  /// callers for the same content share one fetch.
  #[instrument(level = "info", skip(self))]
  pub async fn load_questions(&self, content_id: EntityId) -> Result<Vec<Question>, ApiError> {
    let cell = {
      let mut st = self.state.write().await;
      if let Some(qs) = st.questions.get(&content_id) {
        return Ok(qs.clone());
      }
      st.question_loads.entry(content_id).or_default().clone()
    };

    let qs = cell.get_or_try_init(|| self.source.content_questions(content_id)).await?.clone();

    let mut st = self.state.write().await;
    // An invalidate during the fetch dropped the slot; don't cache the stale rows.
    if st.question_loads.get(&content_id).is_some_and(|c| Arc::ptr_eq(c, &cell)) {
      st.question_loads.remove(&content_id);
      st.questions.insert(content_id, qs.clone());
    }
    Ok(qs)
  }

  /// Drop cached questions so the next `load_questions` refetches.
  pub async fn invalidate_questions(&self, content_id: EntityId) {
    let mut st = self.state.write().await;
    st.questions.remove(&content_id);
    st.question_loads.remove(&content_id);
  }

  //
  // Mutations: call the server, then mirror the change locally.
  //

  #[instrument(level = "info", skip(self), fields(?dir))]
  pub async fn move_content(&self, id: EntityId, dir: MoveDirection) -> Result<(), ApiError> {
    let topic_id = {
      let st = self.state.read().await;
      st.content.iter().find(|c| c.id == id).map(|c| c.topicid).ok_or_else(|| not_cached("content", id))?
    };
    self.source.move_content(id, dir, topic_id).await?;
    let mut st = self.state.write().await;
    let moved = swap_with_neighbor(&mut st.content, |c| c.id == id, |c| c.topicid == topic_id, dir);
    debug!(target: "catalog", id, topic_id, moved, "Content move mirrored");
    Ok(())
  }

  #[instrument(level = "info", skip(self), fields(?dir))]
  pub async fn move_topic(&self, id: EntityId, dir: MoveDirection) -> Result<(), ApiError> {
    let unit = {
      let st = self.state.read().await;
      st.topic(id).map(|t| t.unit.clone()).ok_or_else(|| not_cached("topics", id))?
    };
    self.source.move_topic(id, dir, &unit).await?;
    let mut st = self.state.write().await;
    if let Some(group) = st.unit_groups.iter_mut().find(|g| g.topics.iter().any(|t| t.id == id)) {
      let moved = swap_with_neighbor(&mut group.topics, |t| t.id == id, |_| true, dir);
      debug!(target: "catalog", id, %unit, moved, "Topic move mirrored");
    }
    Ok(())
  }

  #[instrument(level = "info", skip(self))]
  pub async fn toggle_content_visibility(&self, id: EntityId) -> Result<bool, ApiError> {
    if !self.state.read().await.content.iter().any(|c| c.id == id) {
      return Err(not_cached("content", id));
    }
    self.source.toggle_content(id).await?;
    let mut st = self.state.write().await;
    let row = st.content.iter_mut().find(|c| c.id == id).ok_or_else(|| not_cached("content", id))?;
    let now = toggled_visibility(row.visible());
    row.set_visible(now);
    Ok(now)
  }

  #[instrument(level = "info", skip(self))]
  pub async fn toggle_topic_visibility(&self, id: EntityId) -> Result<bool, ApiError> {
    if self.state.read().await.topic(id).is_none() {
      return Err(not_cached("topics", id));
    }
    self.source.toggle_topic(id).await?;
    let mut st = self.state.write().await;
    let topic = st
      .unit_groups
      .iter_mut()
      .flat_map(|g| g.topics.iter_mut())
      .find(|t| t.id == id)
      .ok_or_else(|| not_cached("topics", id))?;
    let now = toggled_visibility(topic.visible());
    topic.set_visible(now);
    Ok(now)
  }

  #[instrument(level = "info", skip(self))]
  pub async fn remove_content(&self, id: EntityId) -> Result<(), ApiError> {
    self.source.remove_content(id).await?;
    let mut st = self.state.write().await;
    st.content.retain(|c| c.id != id);
    st.questions.remove(&id);
    Ok(())
  }

  /// Removes the topic and, mirroring the server-side cascade, its cached content and questions.
  #[instrument(level = "info", skip(self))]
  pub async fn remove_topic(&self, id: EntityId) -> Result<(), ApiError> {
    self.source.remove_topic(id).await?;
    let mut st = self.state.write().await;
    for group in st.unit_groups.iter_mut() {
      group.topics.retain(|t| t.id != id);
    }
    let dropped: Vec<EntityId> = st.content.iter().filter(|c| c.topicid == id).map(|c| c.id).collect();
    st.content.retain(|c| c.topicid != id);
    for cid in dropped {
      st.questions.remove(&cid);
    }
    st.loaded_topic_ids.remove(&id);
    if st.expanded_topic == Some(id) {
      st.expanded_topic = None;
      st.cancel_topic_fetch();
    }
    Ok(())
  }

  /// Insert or replace a content row after a create/update.
  pub async fn upsert_content(&self, content: Content) {
    self.state.write().await.merge_content(vec![content]);
  }

  /// Insert or replace a topic in its unit group after a create/update.
  pub async fn upsert_topic(&self, topic: Topic) {
    let mut st = self.state.write().await;
    for group in st.unit_groups.iter_mut() {
      group.topics.retain(|t| t.id != topic.id);
    }
    match st.unit_groups.iter_mut().find(|g| g.unit == topic.unit) {
      Some(group) => group.topics.push(topic),
      None => st.unit_groups.push(UnitGroup { unit: topic.unit.clone(), topics: vec![topic] }),
    }
  }

  /// Replace cached questions of a content item after a create/update.
  pub async fn set_questions(&self, content_id: EntityId, questions: Vec<Question>) {
    self.state.write().await.questions.insert(content_id, questions);
  }
}

fn not_cached(resource: &str, id: EntityId) -> ApiError {
  ApiError::NotFound { resource: resource.to_string(), id: id.to_string() }
}
