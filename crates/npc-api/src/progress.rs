//! Activity logging, the achievement evaluator, and progress endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/activity` | Body: `{"user_id":...,"kind":"...","detail":"..."}` |
//! | `GET`  | `/achievements?user_id=<id>` | |
//! | `GET`  | `/milestones?user_id=<id>` | |
//!
//! Every mutating handler funnels through [`evaluate`], so achievements are
//! checked after each qualifying action, not on a timer.

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use npc_core::{
  achievement::{Achievement, Milestone, earned_rules},
  store::CompanionStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// A created/updated entity plus any achievements the action unlocked.
#[derive(Debug, Serialize)]
pub struct Awarded<T: Serialize> {
  #[serde(flatten)]
  pub item: T,
  pub new_achievements: Vec<Achievement>,
}

/// Log an activity, bump the daily counter, and grant any newly earned
/// achievements (recording a milestone for each).
///
/// Grants are idempotent at the store layer, so concurrent evaluations of
/// the same user can race without double-granting.
pub(crate) async fn evaluate<S>(
  store: &S,
  user_id: Uuid,
  kind: &str,
  detail: Option<String>,
) -> Result<Vec<Achievement>, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  store
    .log_activity(user_id, kind.to_owned(), detail)
    .await
    .map_err(ApiError::store)?;
  store
    .bump_daily_activity(user_id, Utc::now().date_naive())
    .await
    .map_err(ApiError::store)?;

  let counts = store
    .activity_counts(user_id)
    .await
    .map_err(ApiError::store)?;

  let mut fresh = Vec::new();
  for rule in earned_rules(&counts) {
    if let Some(achievement) = store
      .grant_achievement(user_id, rule.code.to_owned())
      .await
      .map_err(ApiError::store)?
    {
      store
        .record_milestone(user_id, rule.label.to_owned())
        .await
        .map_err(ApiError::store)?;
      tracing::info!(%user_id, code = rule.code, "achievement earned");
      fresh.push(achievement);
    }
  }
  Ok(fresh)
}

/// Fetch a user or fail with 404.
pub(crate) async fn require_user<S>(
  store: &S,
  user_id: Uuid,
) -> Result<npc_core::user::User, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  store
    .get_user(user_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {user_id} not found")))
}

#[derive(Debug, Deserialize)]
pub struct UserParams {
  pub user_id: Uuid,
}

// ─── Record ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RecordBody {
  pub user_id: Uuid,
  pub kind:    String,
  pub detail:  Option<String>,
}

/// `POST /activity`
pub async fn record<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<RecordBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if body.kind.trim().is_empty() {
    return Err(ApiError::BadRequest("kind must not be empty".into()));
  }
  require_user(&*state.store, body.user_id).await?;

  let new_achievements =
    evaluate(&*state.store, body.user_id, &body.kind, body.detail).await?;
  Ok((
    StatusCode::CREATED,
    Json(serde_json::json!({ "new_achievements": new_achievements })),
  ))
}

// ─── Lists ───────────────────────────────────────────────────────────────────

/// `GET /achievements?user_id=<id>`
pub async fn achievements<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<UserParams>,
) -> Result<Json<Vec<Achievement>>, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let earned = state
    .store
    .list_achievements(params.user_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(earned))
}

/// `GET /milestones?user_id=<id>`
pub async fn milestones<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<UserParams>,
) -> Result<Json<Vec<Milestone>>, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let reached = state
    .store
    .list_milestones(params.user_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(reached))
}
