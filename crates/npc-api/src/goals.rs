//! Handlers for `/goals` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/goals` | |
//! | `GET`    | `/goals?user_id=<id>` | |
//! | `POST`   | `/goals/:id/complete` | Idempotent |
//! | `DELETE` | `/goals/:id` | |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use npc_core::{
  goal::{Goal, NewGoal},
  store::CompanionStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState,
  error::ApiError,
  progress::{Awarded, UserParams, evaluate, require_user},
};

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub user_id:     Uuid,
  pub title:       String,
  pub description: Option<String>,
}

/// `POST /goals`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if body.title.trim().is_empty() {
    return Err(ApiError::BadRequest("title must not be empty".into()));
  }
  require_user(&*state.store, body.user_id).await?;

  let goal = state
    .store
    .add_goal(NewGoal {
      user_id:     body.user_id,
      title:       body.title,
      description: body.description,
    })
    .await
    .map_err(ApiError::store)?;

  let new_achievements =
    evaluate(&*state.store, goal.user_id, "goal_created", None).await?;
  Ok((StatusCode::CREATED, Json(Awarded { item: goal, new_achievements })))
}

/// `GET /goals?user_id=<id>`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<UserParams>,
) -> Result<Json<Vec<Goal>>, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let goals = state
    .store
    .list_goals(params.user_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(goals))
}

/// `POST /goals/:id/complete`
pub async fn complete<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Awarded<Goal>>, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let goal = state
    .store
    .complete_goal(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("goal {id} not found")))?;

  let new_achievements =
    evaluate(&*state.store, goal.user_id, "goal_completed", None).await?;
  Ok(Json(Awarded { item: goal, new_achievements }))
}

/// `DELETE /goals/:id`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let deleted = state.store.delete_goal(id).await.map_err(ApiError::store)?;
  if !deleted {
    return Err(ApiError::NotFound(format!("goal {id} not found")));
  }
  Ok(StatusCode::NO_CONTENT)
}
