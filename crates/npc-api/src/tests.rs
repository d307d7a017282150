//! Router tests against an in-memory store, a scripted model, and a
//! recording mailer.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use npc_llm::{ChannelStreamReceiver, ChatModel, StreamChunk, Turn};
use npc_mailer::{Email, Mailer};
use npc_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{AppState, api_router};

// ─── Test doubles ────────────────────────────────────────────────────────────

/// Streams a fixed reply, ignoring the prompt.
struct StubModel;

#[async_trait]
impl ChatModel for StubModel {
  async fn stream_chat(
    &self,
    _system: String,
    _turns: Vec<Turn>,
  ) -> npc_llm::Result<ChannelStreamReceiver> {
    let (tx, rx) = ChannelStreamReceiver::pair(8);
    tokio::spawn(async move {
      let _ = tx.send(StreamChunk::TextDelta { text: "Hello ".into() }).await;
      let _ = tx.send(StreamChunk::TextDelta { text: "there!".into() }).await;
      let _ = tx
        .send(StreamChunk::Done { content: "Hello there!".into() })
        .await;
    });
    Ok(rx)
  }
}

/// Captures every email instead of sending.
#[derive(Default)]
struct RecordingMailer {
  sent: Mutex<Vec<Email>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
  async fn send(&self, email: Email) -> npc_mailer::Result<()> {
    self.sent.lock().unwrap().push(email);
    Ok(())
  }
}

async fn make_app() -> (Router, Arc<RecordingMailer>) {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let mailer = Arc::new(RecordingMailer::default());
  let state = AppState {
    store:           Arc::new(store),
    model:           Arc::new(StubModel),
    mailer:          mailer.clone(),
    public_base_url: "https://npc.test".into(),
  };
  (api_router(state), mailer)
}

// ─── Request helpers ─────────────────────────────────────────────────────────

async fn send(
  app: &Router,
  method: &str,
  uri: &str,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let request = match body {
    Some(json_body) => Request::builder()
      .method(method)
      .uri(uri)
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(json_body.to_string()))
      .unwrap(),
    None => Request::builder()
      .method(method)
      .uri(uri)
      .body(Body::empty())
      .unwrap(),
  };

  let response = app.clone().oneshot(request).await.unwrap();
  let status = response.status();
  let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
    .await
    .unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

async fn create_user(app: &Router, name: &str) -> String {
  let (status, body) = send(
    app,
    "POST",
    "/users",
    Some(json!({
      "name": name,
      "age": 14,
      "interests": ["drawing"],
      "companion_name": "Nova",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  body["user_id"].as_str().unwrap().to_owned()
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn user_crud() {
  let (app, _) = make_app().await;
  let id = create_user(&app, "Riley").await;

  let (status, body) = send(&app, "GET", &format!("/users/{id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["name"], "Riley");

  let (status, body) = send(
    &app,
    "PATCH",
    &format!("/users/{id}"),
    Some(json!({ "companion_name": "Comet" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["companion_name"], "Comet");

  let (status, _) = send(&app, "DELETE", &format!("/users/{id}"), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (status, _) = send(&app, "GET", &format!("/users/{id}"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_user_requires_name() {
  let (app, _) = make_app().await;
  let (status, body) = send(
    &app,
    "POST",
    "/users",
    Some(json!({ "name": "  ", "companion_name": "Nova" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("name"));
}

#[tokio::test]
async fn empty_patch_is_rejected() {
  let (app, _) = make_app().await;
  let id = create_user(&app, "Riley").await;

  let (status, _) =
    send(&app, "PATCH", &format!("/users/{id}"), Some(json!({}))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ─── Chat ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn chat_message_roundtrip() {
  let (app, _) = make_app().await;
  let user_id = create_user(&app, "Riley").await;

  let (status, session) = send(
    &app,
    "POST",
    "/chat/sessions",
    Some(json!({ "user_id": user_id })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let session_id = session["session_id"].as_str().unwrap().to_owned();

  let (status, body) = send(
    &app,
    "POST",
    &format!("/chat/sessions/{session_id}/messages"),
    Some(json!({ "content": "hey" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["content"], "hey");
  assert_eq!(body["role"], "user");

  // First user message unlocks first_chat.
  let codes: Vec<_> = body["new_achievements"]
    .as_array()
    .unwrap()
    .iter()
    .map(|a| a["code"].as_str().unwrap())
    .collect();
  assert!(codes.contains(&"first_chat"));

  // Assistant rows can be appended too; they never unlock achievements.
  let (status, body) = send(
    &app,
    "POST",
    &format!("/chat/sessions/{session_id}/messages"),
    Some(json!({ "role": "assistant", "content": "hi Riley!" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["role"], "assistant");
  assert!(body["new_achievements"].as_array().unwrap().is_empty());

  let (status, transcript) = send(
    &app,
    "GET",
    &format!("/chat/sessions/{session_id}/messages"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(transcript.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn stream_relays_and_persists_assistant_reply() {
  let (app, _) = make_app().await;
  let user_id = create_user(&app, "Riley").await;
  let (_, session) = send(
    &app,
    "POST",
    "/chat/sessions",
    Some(json!({ "user_id": user_id })),
  )
  .await;
  let session_id = session["session_id"].as_str().unwrap().to_owned();

  let request = Request::builder()
    .method("POST")
    .uri(format!("/chat/sessions/{session_id}/stream"))
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from(json!({ "content": "hi" }).to_string()))
    .unwrap();
  let response = app.clone().oneshot(request).await.unwrap();
  assert_eq!(response.status(), StatusCode::OK);

  let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
    .await
    .unwrap();
  let sse = String::from_utf8(bytes.to_vec()).unwrap();
  assert!(sse.contains("text_delta"));
  assert!(sse.contains("Hello there!"));

  // The relay persisted both sides of the exchange before closing the body.
  let (status, transcript) = send(
    &app,
    "GET",
    &format!("/chat/sessions/{session_id}/messages"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  let rows = transcript.as_array().unwrap();
  assert_eq!(rows.len(), 2);
  assert_eq!(rows[1]["role"], "assistant");
  assert_eq!(rows[1]["content"], "Hello there!");
}

#[tokio::test]
async fn empty_chat_message_rejected() {
  let (app, _) = make_app().await;
  let user_id = create_user(&app, "Riley").await;
  let (_, session) = send(
    &app,
    "POST",
    "/chat/sessions",
    Some(json!({ "user_id": user_id })),
  )
  .await;
  let session_id = session["session_id"].as_str().unwrap();

  let (status, _) = send(
    &app,
    "POST",
    &format!("/chat/sessions/{session_id}/messages"),
    Some(json!({ "content": "   " })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn session_for_unknown_user_is_404() {
  let (app, _) = make_app().await;
  let (status, _) = send(
    &app,
    "POST",
    "/chat/sessions",
    Some(json!({ "user_id": uuid::Uuid::new_v4() })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── Check-ins ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn checkin_then_streak() {
  let (app, _) = make_app().await;
  let user_id = create_user(&app, "Riley").await;

  let (status, body) = send(
    &app,
    "POST",
    "/checkins",
    Some(json!({
      "user_id": user_id,
      "mood": "happy",
      "prompt": "How was your day?",
      "response": "pretty good",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let codes: Vec<_> = body["new_achievements"]
    .as_array()
    .unwrap()
    .iter()
    .map(|a| a["code"].as_str().unwrap())
    .collect();
  assert!(codes.contains(&"first_checkin"));

  let (status, body) = send(
    &app,
    "GET",
    &format!("/checkins/streak?user_id={user_id}"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["streak"], 1);
}

// ─── Goals ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn goal_lifecycle() {
  let (app, _) = make_app().await;
  let user_id = create_user(&app, "Riley").await;

  let (status, goal) = send(
    &app,
    "POST",
    "/goals",
    Some(json!({ "user_id": user_id, "title": "finish the comic" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let codes: Vec<_> = goal["new_achievements"]
    .as_array()
    .unwrap()
    .iter()
    .map(|a| a["code"].as_str().unwrap())
    .collect();
  assert!(codes.contains(&"goal_setter"));
  let goal_id = goal["goal_id"].as_str().unwrap().to_owned();

  let (status, done) = send(
    &app,
    "POST",
    &format!("/goals/{goal_id}/complete"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(done["completed"], true);

  let (status, _) = send(&app, "DELETE", &format!("/goals/{goal_id}"), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, _) = send(&app, "DELETE", &format!("/goals/{goal_id}"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── Museum ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn museum_item_requires_wing() {
  let (app, _) = make_app().await;
  let user_id = create_user(&app, "Riley").await;

  let (status, _) = send(
    &app,
    "POST",
    "/museum",
    Some(json!({
      "user_id": user_id,
      "title": "First sketch",
      "insight": "I can draw",
      "wing": "",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ─── Worlds ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn world_create_join_and_elements() {
  let (app, _) = make_app().await;
  let owner_id = create_user(&app, "Riley").await;
  let friend_id = create_user(&app, "Sam").await;
  let outsider_id = create_user(&app, "Alex").await;

  let (status, world) = send(
    &app,
    "POST",
    "/worlds",
    Some(json!({ "owner_id": owner_id, "name": "Moonbase" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let world_id = world["world_id"].as_str().unwrap().to_owned();
  let invite = world["invite_code"].as_str().unwrap().to_owned();
  assert_eq!(invite.len(), 6);

  // Owner membership counts as joining a world.
  let codes: Vec<_> = world["new_achievements"]
    .as_array()
    .unwrap()
    .iter()
    .map(|a| a["code"].as_str().unwrap())
    .collect();
  assert!(codes.contains(&"world_builder"));

  let (status, joined) = send(
    &app,
    "POST",
    "/worlds/join",
    Some(json!({ "user_id": friend_id, "invite_code": invite })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(joined["member_count"], 2);

  let (status, _) = send(
    &app,
    "POST",
    "/worlds/join",
    Some(json!({ "user_id": friend_id, "invite_code": "ZZZZZZ" })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  // A member can post elements; an outsider gets a 403.
  let (status, _) = send(
    &app,
    "POST",
    &format!("/worlds/{world_id}/elements"),
    Some(json!({
      "author_id": friend_id,
      "kind": "location",
      "name": "The Dome",
      "description": "glass over the crater",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);

  let (status, _) = send(
    &app,
    "POST",
    &format!("/worlds/{world_id}/elements"),
    Some(json!({
      "author_id": outsider_id,
      "kind": "lore",
      "name": "Intrusion",
      "description": "should not land",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  // Reading elements needs no membership.
  let (status, elements) = send(
    &app,
    "GET",
    &format!("/worlds/{world_id}/elements"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(elements.as_array().unwrap().len(), 1);
}

// ─── Parents ─────────────────────────────────────────────────────────────────

fn token_from_email(email: &Email) -> String {
  let start = email.body.find("token=").unwrap() + "token=".len();
  email.body[start..start + 64].to_owned()
}

#[tokio::test]
async fn parent_magic_link_flow() {
  let (app, mailer) = make_app().await;
  let user_id = create_user(&app, "Riley").await;

  let (status, connection) = send(
    &app,
    "POST",
    "/parents/connections",
    Some(json!({ "user_id": user_id, "parent_email": "Parent@Example.com" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(connection["parent_email"], "parent@example.com");
  assert_eq!(connection["verified"], false);
  // The digest never leaves the server.
  assert!(connection.get("token_hash").is_none());
  let connection_id = connection["connection_id"].as_str().unwrap().to_owned();

  // An unverified connection cannot request reports.
  let (status, _) = send(
    &app,
    "POST",
    "/parents/reports",
    Some(json!({ "connection_id": connection_id })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  // The raw token only exists inside the emailed link.
  let token = {
    let sent = mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "parent@example.com");
    token_from_email(&sent[0])
  };

  let (status, _) = send(
    &app,
    "POST",
    "/parents/verify",
    Some(json!({ "token": "0000000000000000" })),
  )
  .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, verified) = send(
    &app,
    "POST",
    "/parents/verify",
    Some(json!({ "token": token })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(verified["verified"], true);

  // Seed some activity, then the report both stores and emails.
  send(
    &app,
    "POST",
    "/checkins",
    Some(json!({
      "user_id": user_id,
      "mood": "good",
      "prompt": "p",
      "response": "r",
    })),
  )
  .await;

  let (status, report) = send(
    &app,
    "POST",
    "/parents/reports",
    Some(json!({ "connection_id": connection_id })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(report["summary"]["checkins"], 1);

  let sent = mailer.sent.lock().unwrap();
  assert_eq!(sent.len(), 2);
  assert!(sent[1].subject.contains("Riley"));
  assert!(sent[1].body.contains("Daily check-ins: 1"));

  let (status, reports) = send(
    &app,
    "GET",
    &format!("/parents/reports?connection_id={connection_id}"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(reports.as_array().unwrap().len(), 1);
}

// ─── Activity ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn activity_for_unknown_user_is_404() {
  let (app, _) = make_app().await;
  let (status, _) = send(
    &app,
    "POST",
    "/activity",
    Some(json!({ "user_id": uuid::Uuid::new_v4(), "kind": "chat" })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}
