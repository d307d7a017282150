//! Handlers for `/checkins` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/checkins` | One per user per day; same-day posts replace |
//! | `GET`  | `/checkins?user_id=<id>[&on=YYYY-MM-DD]` | |
//! | `GET`  | `/checkins/streak?user_id=<id>` | Consecutive-day streak |

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{NaiveDate, Utc};
use npc_core::{
  checkin::{Checkin, NewCheckin, streak_length},
  store::CompanionStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState,
  error::ApiError,
  progress::{Awarded, UserParams, evaluate, require_user},
};

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub user_id:    Uuid,
  /// Defaults to today (UTC) when omitted.
  pub checked_on: Option<NaiveDate>,
  pub mood:       String,
  pub prompt:     String,
  pub response:   String,
}

/// `POST /checkins`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if body.mood.trim().is_empty() {
    return Err(ApiError::BadRequest("mood must not be empty".into()));
  }
  require_user(&*state.store, body.user_id).await?;

  let checkin = state
    .store
    .upsert_checkin(NewCheckin {
      user_id:    body.user_id,
      checked_on: body.checked_on.unwrap_or_else(|| Utc::now().date_naive()),
      mood:       body.mood,
      prompt:     body.prompt,
      response:   body.response,
    })
    .await
    .map_err(ApiError::store)?;

  let new_achievements =
    evaluate(&*state.store, body.user_id, "checkin", None).await?;
  Ok((StatusCode::CREATED, Json(Awarded { item: checkin, new_achievements })))
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub user_id: Uuid,
  pub on:      Option<NaiveDate>,
}

/// `GET /checkins?user_id=<id>[&on=<date>]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Checkin>>, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let checkins = match params.on {
    Some(on) => state
      .store
      .get_checkin(params.user_id, on)
      .await
      .map_err(ApiError::store)?
      .into_iter()
      .collect(),
    None => state
      .store
      .list_checkins(params.user_id)
      .await
      .map_err(ApiError::store)?,
  };
  Ok(Json(checkins))
}

// ─── Streak ──────────────────────────────────────────────────────────────────

/// `GET /checkins/streak?user_id=<id>`
pub async fn streak<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<UserParams>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let dates = state
    .store
    .checkin_dates(params.user_id)
    .await
    .map_err(ApiError::store)?;
  let streak = streak_length(Utc::now().date_naive(), &dates);
  Ok(Json(serde_json::json!({ "streak": streak })))
}
