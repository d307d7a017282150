//! Handlers for `/museum` endpoints — the "museum of me" collection.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/museum` | |
//! | `GET`    | `/museum?user_id=<id>[&wing=<wing>]` | |
//! | `DELETE` | `/museum/:id` | |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use npc_core::{
  museum::{MuseumItem, NewMuseumItem},
  store::CompanionStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState,
  error::ApiError,
  progress::{Awarded, evaluate, require_user},
};

/// `POST /museum`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<NewMuseumItem>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if body.title.trim().is_empty() {
    return Err(ApiError::BadRequest("title must not be empty".into()));
  }
  if body.wing.trim().is_empty() {
    return Err(ApiError::BadRequest("wing must not be empty".into()));
  }
  require_user(&*state.store, body.user_id).await?;

  let item = state
    .store
    .add_museum_item(body)
    .await
    .map_err(ApiError::store)?;

  let new_achievements =
    evaluate(&*state.store, item.user_id, "museum_item", None).await?;
  Ok((StatusCode::CREATED, Json(Awarded { item, new_achievements })))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub user_id: Uuid,
  pub wing:    Option<String>,
}

/// `GET /museum?user_id=<id>[&wing=<wing>]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<MuseumItem>>, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let items = state
    .store
    .list_museum_items(params.user_id, params.wing)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(items))
}

/// `DELETE /museum/:id`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let deleted = state
    .store
    .delete_museum_item(id)
    .await
    .map_err(ApiError::store)?;
  if !deleted {
    return Err(ApiError::NotFound(format!("museum item {id} not found")));
  }
  Ok(StatusCode::NO_CONTENT)
}
