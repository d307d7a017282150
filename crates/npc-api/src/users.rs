//! Handlers for `/users` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/users` | Body: profile + companion fields |
//! | `GET`    | `/users/:id` | 404 if not found |
//! | `PATCH`  | `/users/:id` | Partial update; empty body is a 400 |
//! | `DELETE` | `/users/:id` | Cascades to every owned row |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use npc_core::{
  store::CompanionStore,
  user::{NewUser, User, UserUpdate},
};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// `POST /users`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<NewUser>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if body.name.trim().is_empty() {
    return Err(ApiError::BadRequest("name must not be empty".into()));
  }
  if body.companion_name.trim().is_empty() {
    return Err(ApiError::BadRequest("companion_name must not be empty".into()));
  }

  let user = state.store.add_user(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(user)))
}

/// `GET /users/:id`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<User>, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let user = crate::progress::require_user(&*state.store, id).await?;
  Ok(Json(user))
}

/// `PATCH /users/:id`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<UserUpdate>,
) -> Result<Json<User>, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if body.is_empty() {
    return Err(ApiError::BadRequest("no fields to update".into()));
  }

  let user = state
    .store
    .update_user(id, body)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))?;
  Ok(Json(user))
}

/// `DELETE /users/:id`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let deleted = state.store.delete_user(id).await.map_err(ApiError::store)?;
  if !deleted {
    return Err(ApiError::NotFound(format!("user {id} not found")));
  }
  tracing::info!(user_id = %id, "user deleted with full cascade");
  Ok(StatusCode::NO_CONTENT)
}
