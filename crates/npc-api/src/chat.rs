//! Handlers for `/chat` endpoints — sessions, transcripts, and the
//! streaming relay to the companion model.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/chat/sessions` | |
//! | `GET`  | `/chat/sessions?user_id=<id>` | |
//! | `GET`  | `/chat/sessions/:id/messages` | Full transcript |
//! | `POST` | `/chat/sessions/:id/messages` | Append a row |
//! | `POST` | `/chat/sessions/:id/stream` | SSE relay; the model runs here |
//!
//! The stream endpoint persists the assistant reply from a detached task, so
//! a browser that navigates away mid-stream never loses the message.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::{
    IntoResponse,
    sse::{Event, KeepAlive, Sse},
  },
};
use futures::Stream;
use npc_core::{
  achievement::Achievement,
  chat::{ChatMessage, ChatSession, MessageRole},
  store::CompanionStore,
  user::User,
};
use npc_llm::{ChannelStreamReceiver, StreamAccumulator, Turn, system_prompt};
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
  AppState,
  error::ApiError,
  progress::{Awarded, UserParams, evaluate, require_user},
};

// ─── Sessions ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateSessionBody {
  pub user_id: Uuid,
  pub title:   Option<String>,
}

/// `POST /chat/sessions`
pub async fn create_session<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<CreateSessionBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  require_user(&*state.store, body.user_id).await?;
  let session = state
    .store
    .add_session(body.user_id, body.title)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(session)))
}

/// `GET /chat/sessions?user_id=<id>`
pub async fn list_sessions<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<UserParams>,
) -> Result<Json<Vec<ChatSession>>, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let sessions = state
    .store
    .list_sessions(params.user_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(sessions))
}

/// `GET /chat/sessions/:id/messages`
pub async fn list_messages<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<ChatMessage>>, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  require_session(&*state.store, id).await?;
  let messages = state
    .store
    .list_messages(id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(messages))
}

// ─── Messages ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MessageBody {
  pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct AppendBody {
  /// Defaults to `user` when omitted.
  pub role:    Option<MessageRole>,
  pub content: String,
}

async fn require_session<S>(
  store: &S,
  id: Uuid,
) -> Result<ChatSession, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  store
    .get_session(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("chat session {id} not found")))
}

/// Persist the incoming user message and start a model stream over the full
/// transcript.
async fn start_completion<S>(
  state: &AppState<S>,
  session_id: Uuid,
  content: String,
) -> Result<(ChatMessage, Vec<Achievement>, ChannelStreamReceiver), ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if content.trim().is_empty() {
    return Err(ApiError::BadRequest("content must not be empty".into()));
  }

  let session = require_session(&*state.store, session_id).await?;
  let user: User = require_user(&*state.store, session.user_id).await?;

  let user_message = state
    .store
    .add_message(session_id, MessageRole::User, content)
    .await
    .map_err(ApiError::store)?;
  let new_achievements =
    evaluate(&*state.store, session.user_id, "chat", None).await?;

  // Transcript already includes the message persisted above.
  let transcript = state
    .store
    .list_messages(session_id)
    .await
    .map_err(ApiError::store)?;
  let turns: Vec<Turn> = transcript.iter().map(Turn::from).collect();

  let receiver = state.model.stream_chat(system_prompt(&user), turns).await?;
  Ok((user_message, new_achievements, receiver))
}

/// `POST /chat/sessions/:id/messages` — append a row to the transcript.
///
/// No model call happens here; completions run on the stream endpoint.
pub async fn post_message<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<AppendBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if body.content.trim().is_empty() {
    return Err(ApiError::BadRequest("content must not be empty".into()));
  }
  let session = require_session(&*state.store, id).await?;

  let role = body.role.unwrap_or(MessageRole::User);
  let message = state
    .store
    .add_message(id, role, body.content)
    .await
    .map_err(ApiError::store)?;

  // Only the teen's own turns count toward chat achievements.
  let new_achievements = if role == MessageRole::User {
    evaluate(&*state.store, session.user_id, "chat", None).await?
  } else {
    Vec::new()
  };

  Ok((
    StatusCode::CREATED,
    Json(Awarded { item: message, new_achievements }),
  ))
}

/// `POST /chat/sessions/:id/stream` — relay the reply as server-sent events.
pub async fn stream<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<MessageBody>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError>
where
  S: CompanionStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let (_user_message, _new_achievements, mut receiver) =
    start_completion(&state, id, body.content).await?;

  let (out_tx, out_rx) = mpsc::channel::<npc_llm::StreamChunk>(64);

  // Detached relay: keeps draining the model and persists the reply even if
  // the client hangs up mid-stream.
  let store = state.store.clone();
  tokio::spawn(async move {
    let mut acc = StreamAccumulator::new();
    while let Some(chunk) = receiver.next().await {
      let finished = acc.push(&chunk);
      let _ = out_tx.send(chunk).await;
      if finished {
        break;
      }
    }
    if acc.text().is_empty() {
      return;
    }
    if let Err(e) = store
      .add_message(id, MessageRole::Assistant, acc.text().to_owned())
      .await
    {
      tracing::error!(session_id = %id, error = %e, "failed to persist assistant reply");
    }
  });

  let events = futures::stream::unfold(out_rx, |mut rx| async move {
    let chunk = rx.recv().await?;
    Some((Event::default().json_data(&chunk), rx))
  });

  Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
