//! In-process admin REST server for tests.
//!
//! Serves the same routes the services call, backed by an in-memory table per
//! entity. Every request is counted as "METHOD /path" (query stripped), and
//! `fail_next` answers that many upcoming requests with 503 before handling
//! anything. `fail_content_put` and `fail_paginated` break a single endpoint
//! with a 500.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::api::ApiClient;
use crate::config::RetryConfig;
use crate::domain::{Content, EntityId, Question, QuestionType, Topic, UnitGroup, VocabularyItem};
use crate::ordering::{group_by_key, sorted_by_order_index, swap_with_neighbor, toggled_visibility, Visible};
use crate::protocol::{CreatedOut, ErrorOut, PatchAction, VocabularySearchIn, VocabularySearchOut};

#[derive(Debug, Default)]
pub struct MockDb {
    pub topics: Vec<Topic>,
    pub content: Vec<Content>,
    pub questions: Vec<Question>,
    pub vocabulary: Vec<VocabularyItem>,
    pub fail_next: u32,
    pub fail_content_put: bool,
    pub fail_paginated: bool,
    next_id: EntityId,
    hits: HashMap<String, usize>,
}

impl MockDb {
    fn alloc_id(&mut self) -> EntityId {
        self.next_id += 1;
        self.next_id
    }

    pub fn add_topic(&mut self, name: &str, unit: &str, order_index: Option<i64>) -> EntityId {
        let id = self.alloc_id();
        self.topics.push(Topic {
            id,
            name: name.into(),
            short_summary: String::new(),
            unit: unit.into(),
            program: "Grapeseed".into(),
            parentid: None,
            showstudent: None,
            visible: None,
            order_index,
        });
        id
    }

    pub fn add_content(&mut self, title: &str, topicid: EntityId, order_index: Option<i64>) -> EntityId {
        let id = self.alloc_id();
        self.content.push(Content {
            id,
            title: title.into(),
            infor1: String::new(),
            infor2: String::new(),
            image1: None,
            image2: None,
            video1: None,
            video2: None,
            topicid,
            visible: None,
            order_index,
            question_count: 0,
        });
        id
    }

    pub fn add_question(&mut self, contentid: EntityId, body: &str) -> EntityId {
        let id = self.alloc_id();
        self.questions.push(Question {
            id,
            program: "Grapeseed".into(),
            level: "1".into(),
            contentid,
            question_type: QuestionType::Text,
            question: body.into(),
            choice1: String::new(),
            choice2: String::new(),
            choice3: String::new(),
            choice4: String::new(),
            correct_choice: String::new(),
            answer: "answer".into(),
            explanation: String::new(),
            time: None,
            video: None,
            picture: None,
        });
        id
    }

    pub fn add_vocabulary(&mut self, word: &str, definition: &str) -> EntityId {
        let id = self.alloc_id();
        self.vocabulary.push(VocabularyItem {
            id,
            word: word.into(),
            part_of_speech: "noun".into(),
            definition: definition.into(),
            example: String::new(),
            phonetic: String::new(),
            image_url: None,
            video_url: None,
            tags: Vec::new(),
        });
        id
    }
}

type Shared = Arc<Mutex<MockDb>>;

pub struct MockApi {
    pub base_url: String,
    state: Shared,
}

impl MockApi {
    /// Client with a fast retry policy so retry tests don't sleep.
    pub fn client(&self) -> ApiClient {
        let retry = RetryConfig { max_attempts: 3, base_delay_ms: 1, max_delay_ms: 5 };
        ApiClient::new(self.base_url.clone(), Duration::from_secs(5), retry).expect("client")
    }

    pub fn hits(&self, key: &str) -> usize {
        lock(&self.state).hits.get(key).copied().unwrap_or(0)
    }

    pub fn content(&self, id: EntityId) -> Option<Content> {
        lock(&self.state).content.iter().find(|c| c.id == id).cloned()
    }
}

pub async fn spawn(db: MockDb) -> MockApi {
    let state: Shared = Arc::new(Mutex::new(db));
    let app = Router::new()
        .route("/api/admin/topics", get(list_topics).post(create_topic))
        .route("/api/admin/topics/:id", get(get_topic).put(update_topic).patch(patch_topic).delete(delete_topic))
        .route("/api/topics/by-unit", get(topics_by_unit))
        .route("/api/admin/content", get(list_content).post(create_content))
        .route("/api/admin/content/paginated", get(paginated_content))
        .route("/api/admin/content/:id", get(get_content).put(update_content).patch(patch_content).delete(delete_content))
        .route("/api/admin/questions", get(list_questions).post(create_question))
        .route("/api/admin/questions/:id", get(get_question).put(update_question).delete(delete_question))
        .route("/api/vocabulary/search", post(search_vocabulary))
        .layer(middleware::from_fn_with_state(state.clone(), track))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind mock api");
    let addr = listener.local_addr().expect("mock api addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    MockApi { base_url: format!("http://{addr}"), state }
}

fn lock(state: &Shared) -> MutexGuard<'_, MockDb> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

async fn track(State(state): State<Shared>, req: Request, next: Next) -> Response {
    let key = format!("{} {}", req.method(), req.uri().path());
    {
        let mut db = lock(&state);
        *db.hits.entry(key).or_default() += 1;
        if db.fail_next > 0 {
            db.fail_next -= 1;
            return fail(StatusCode::SERVICE_UNAVAILABLE, "try again later");
        }
    }
    next.run(req).await
}

fn fail(status: StatusCode, msg: &str) -> Response {
    (status, Json(ErrorOut { error: msg.into() })).into_response()
}

fn not_found(what: &str) -> Response {
    fail(StatusCode::NOT_FOUND, &format!("{what} not found"))
}

fn created(id: EntityId) -> Response {
    (StatusCode::CREATED, Json(CreatedOut { id })).into_response()
}

/// Overlay the keys of `body` onto `base` and read the result back as `T`.
fn merged<T: DeserializeOwned>(base: Value, body: Value) -> Result<T, Response> {
    let mut out = base;
    if let (Some(dst), Value::Object(src)) = (out.as_object_mut(), body) {
        for (k, v) in src {
            dst.insert(k, v);
        }
    }
    serde_json::from_value(out).map_err(|e| fail(StatusCode::UNPROCESSABLE_ENTITY, &e.to_string()))
}

//
// Topics
//

#[derive(Deserialize)]
struct TopicQuery {
    program: Option<String>,
    unit: Option<String>,
}

async fn list_topics(State(state): State<Shared>, Query(q): Query<TopicQuery>) -> Response {
    let db = lock(&state);
    let rows: Vec<Topic> = db
        .topics
        .iter()
        .filter(|t| q.program.as_ref().map_or(true, |p| &t.program == p))
        .filter(|t| q.unit.as_ref().map_or(true, |u| &t.unit == u))
        .cloned()
        .collect();
    Json(rows).into_response()
}

async fn topics_by_unit(State(state): State<Shared>, Query(q): Query<TopicQuery>) -> Response {
    let db = lock(&state);
    let in_program = db.topics.iter().filter(|t| q.program.as_ref().map_or(true, |p| &t.program == p)).cloned();
    let groups = group_by_key(in_program, |t| t.unit.clone());
    let out: Vec<UnitGroup> = match q.unit {
        None => groups.into_iter().map(|(unit, _)| UnitGroup { unit, topics: Vec::new() }).collect(),
        Some(unit) => groups
            .into_iter()
            .filter(|(u, _)| *u == unit)
            .map(|(unit, topics)| UnitGroup { unit, topics: sorted_by_order_index(&topics) })
            .collect(),
    };
    Json(out).into_response()
}

async fn get_topic(State(state): State<Shared>, Path(id): Path<EntityId>) -> Response {
    match lock(&state).topics.iter().find(|t| t.id == id) {
        Some(t) => Json(t.clone()).into_response(),
        None => not_found("Topic"),
    }
}

async fn create_topic(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut db = lock(&state);
    let id = db.alloc_id();
    let mut topic: Topic = match merged(json!({ "id": id }), body) {
        Ok(t) => t,
        Err(r) => return r,
    };
    let position = db.topics.iter().filter(|t| t.unit == topic.unit && t.program == topic.program).count();
    topic.order_index = Some(position as i64);
    db.topics.push(topic);
    created(id)
}

async fn update_topic(State(state): State<Shared>, Path(id): Path<EntityId>, Json(body): Json<Value>) -> Response {
    let mut db = lock(&state);
    let Some(slot) = db.topics.iter_mut().find(|t| t.id == id) else {
        return not_found("Topic");
    };
    let base = serde_json::to_value(&*slot).unwrap_or(Value::Null);
    match merged::<Topic>(base, body) {
        Ok(mut t) => {
            t.id = id;
            *slot = t;
            Json(CreatedOut { id }).into_response()
        }
        Err(r) => r,
    }
}

async fn patch_topic(State(state): State<Shared>, Path(id): Path<EntityId>, Json(action): Json<PatchAction>) -> Response {
    let mut db = lock(&state);
    let Some(target) = db.topics.iter().find(|t| t.id == id).cloned() else {
        return not_found("Topic");
    };
    match &action {
        PatchAction::ToggleVisibility => {
            if let Some(t) = db.topics.iter_mut().find(|t| t.id == id) {
                let next = toggled_visibility(t.visible());
                t.set_visible(next);
            }
        }
        PatchAction::MoveUp { unit, .. } | PatchAction::MoveDown { unit, .. } => {
            let scope = unit.clone().unwrap_or(target.unit.clone());
            if let Some(dir) = action.direction() {
                swap_with_neighbor(&mut db.topics, |t| t.id == id, |t| t.unit == scope && t.program == target.program, dir);
            }
        }
    }
    Json(json!({ "ok": true })).into_response()
}

async fn delete_topic(State(state): State<Shared>, Path(id): Path<EntityId>) -> Response {
    let mut db = lock(&state);
    if !db.topics.iter().any(|t| t.id == id) {
        return not_found("Topic");
    }
    db.topics.retain(|t| t.id != id);
    let gone: Vec<EntityId> = db.content.iter().filter(|c| c.topicid == id).map(|c| c.id).collect();
    db.content.retain(|c| c.topicid != id);
    db.questions.retain(|q| !gone.contains(&q.contentid));
    StatusCode::NO_CONTENT.into_response()
}

//
// Content
//

#[derive(Deserialize)]
struct PageQuery {
    #[serde(rename = "topicIds", default)]
    topic_ids: String,
    limit: Option<usize>,
}

async fn list_content(State(state): State<Shared>) -> Response {
    Json(lock(&state).content.clone()).into_response()
}

async fn paginated_content(State(state): State<Shared>, Query(q): Query<PageQuery>) -> Response {
    let ids: Vec<EntityId> = q.topic_ids.split(',').filter_map(|s| s.trim().parse().ok()).collect();
    let db = lock(&state);
    if db.fail_paginated {
        return fail(StatusCode::INTERNAL_SERVER_ERROR, "paginated query failed");
    }
    let matching: Vec<&Content> = db.content.iter().filter(|c| ids.contains(&c.topicid)).collect();
    let total = matching.len();
    let rows: Vec<Content> = matching.into_iter().take(q.limit.unwrap_or(usize::MAX)).cloned().collect();
    Json(json!({ "content": rows, "total": total })).into_response()
}

async fn get_content(State(state): State<Shared>, Path(id): Path<EntityId>) -> Response {
    match lock(&state).content.iter().find(|c| c.id == id) {
        Some(c) => Json(c.clone()).into_response(),
        None => not_found("Content"),
    }
}

async fn create_content(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut db = lock(&state);
    let id = db.alloc_id();
    let mut content: Content = match merged(json!({ "id": id }), body) {
        Ok(c) => c,
        Err(r) => return r,
    };
    let position = db.content.iter().filter(|c| c.topicid == content.topicid).count();
    content.order_index = Some(position as i64);
    db.content.push(content);
    created(id)
}

async fn update_content(State(state): State<Shared>, Path(id): Path<EntityId>, Json(body): Json<Value>) -> Response {
    let mut db = lock(&state);
    if db.fail_content_put {
        return fail(StatusCode::INTERNAL_SERVER_ERROR, "content update failed");
    }
    let Some(slot) = db.content.iter_mut().find(|c| c.id == id) else {
        return not_found("Content");
    };
    let base = serde_json::to_value(&*slot).unwrap_or(Value::Null);
    match merged::<Content>(base, body) {
        Ok(mut c) => {
            c.id = id;
            *slot = c;
            Json(CreatedOut { id }).into_response()
        }
        Err(r) => r,
    }
}

async fn patch_content(State(state): State<Shared>, Path(id): Path<EntityId>, Json(action): Json<PatchAction>) -> Response {
    let mut db = lock(&state);
    let Some(target) = db.content.iter().find(|c| c.id == id).cloned() else {
        return not_found("Content");
    };
    match &action {
        PatchAction::ToggleVisibility => {
            if let Some(c) = db.content.iter_mut().find(|c| c.id == id) {
                let next = toggled_visibility(c.visible());
                c.set_visible(next);
            }
        }
        PatchAction::MoveUp { topic_id, .. } | PatchAction::MoveDown { topic_id, .. } => {
            let scope = topic_id.unwrap_or(target.topicid);
            if let Some(dir) = action.direction() {
                swap_with_neighbor(&mut db.content, |c| c.id == id, |c| c.topicid == scope, dir);
            }
        }
    }
    Json(json!({ "ok": true })).into_response()
}

async fn delete_content(State(state): State<Shared>, Path(id): Path<EntityId>) -> Response {
    let mut db = lock(&state);
    if !db.content.iter().any(|c| c.id == id) {
        return not_found("Content");
    }
    db.content.retain(|c| c.id != id);
    db.questions.retain(|q| q.contentid != id);
    StatusCode::NO_CONTENT.into_response()
}

//
// Questions and vocabulary
//

#[derive(Deserialize)]
struct QuestionQuery {
    #[serde(rename = "contentId")]
    content_id: Option<EntityId>,
}

async fn list_questions(State(state): State<Shared>, Query(q): Query<QuestionQuery>) -> Response {
    let db = lock(&state);
    let rows: Vec<Question> = db
        .questions
        .iter()
        .filter(|x| q.content_id.map_or(true, |c| x.contentid == c))
        .cloned()
        .collect();
    Json(rows).into_response()
}

async fn get_question(State(state): State<Shared>, Path(id): Path<EntityId>) -> Response {
    match lock(&state).questions.iter().find(|q| q.id == id) {
        Some(q) => Json(q.clone()).into_response(),
        None => not_found("Question"),
    }
}

async fn create_question(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut db = lock(&state);
    let id = db.alloc_id();
    match merged::<Question>(json!({ "id": id }), body) {
        Ok(q) => {
            db.questions.push(q);
            created(id)
        }
        Err(r) => r,
    }
}

async fn update_question(State(state): State<Shared>, Path(id): Path<EntityId>, Json(body): Json<Value>) -> Response {
    let mut db = lock(&state);
    let Some(slot) = db.questions.iter_mut().find(|q| q.id == id) else {
        return not_found("Question");
    };
    let base = serde_json::to_value(&*slot).unwrap_or(Value::Null);
    match merged::<Question>(base, body) {
        Ok(mut q) => {
            q.id = id;
            *slot = q;
            Json(CreatedOut { id }).into_response()
        }
        Err(r) => r,
    }
}

async fn delete_question(State(state): State<Shared>, Path(id): Path<EntityId>) -> Response {
    let mut db = lock(&state);
    if !db.questions.iter().any(|q| q.id == id) {
        return not_found("Question");
    }
    db.questions.retain(|q| q.id != id);
    StatusCode::NO_CONTENT.into_response()
}

async fn search_vocabulary(State(state): State<Shared>, Json(body): Json<VocabularySearchIn>) -> Response {
    let wanted: Vec<String> = body.words.iter().map(|w| w.to_lowercase()).collect();
    let db = lock(&state);
    let vocabulary_items = db
        .vocabulary
        .iter()
        .filter(|v| wanted.contains(&v.word.to_lowercase()))
        .cloned()
        .collect();
    Json(VocabularySearchOut { vocabulary_items }).into_response()
}
