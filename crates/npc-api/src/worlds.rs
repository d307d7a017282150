//! Handlers for `/worlds` endpoints — collaborative invite-code worlds.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/worlds` | Invite code is server-generated |
//! | `POST` | `/worlds/join` | Body: `{"user_id":...,"invite_code":"K7QM2X"}` |
//! | `GET`  | `/worlds?user_id=<id>` | Worlds the user belongs to |
//! | `GET`  | `/worlds/:id` | World plus member count |
//! | `GET`  | `/worlds/:id/elements` | |
//! | `POST` | `/worlds/:id/elements` | Members only |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use npc_core::{
  store::CompanionStore,
  world::{NewWorld, NewWorldElement, World, WorldElement, WorldView},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState,
  error::ApiError,
  progress::{Awarded, UserParams, evaluate, require_user},
  token,
};

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub owner_id:    Uuid,
  pub name:        String,
  pub description: Option<String>,
}

/// `POST /worlds`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if body.name.trim().is_empty() {
    return Err(ApiError::BadRequest("name must not be empty".into()));
  }
  require_user(&*state.store, body.owner_id).await?;

  let world = state
    .store
    .add_world(NewWorld {
      owner_id:    body.owner_id,
      name:        body.name,
      description: body.description,
      invite_code: token::invite_code(),
    })
    .await
    .map_err(ApiError::store)?;

  let new_achievements =
    evaluate(&*state.store, world.owner_id, "world_created", None).await?;
  Ok((StatusCode::CREATED, Json(Awarded { item: world, new_achievements })))
}

// ─── Join ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct JoinBody {
  pub user_id:     Uuid,
  pub invite_code: String,
}

/// `POST /worlds/join`
pub async fn join<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<JoinBody>,
) -> Result<Json<Awarded<WorldView>>, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  require_user(&*state.store, body.user_id).await?;

  let code = body.invite_code.trim().to_uppercase();
  let world = state
    .store
    .find_world_by_invite(code.clone())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("no world with invite code {code}")))?;

  let newly_joined = state
    .store
    .join_world(world.world_id, body.user_id)
    .await
    .map_err(ApiError::store)?;

  // Rejoining is a harmless no-op; only a first join counts as activity.
  let new_achievements = if newly_joined {
    evaluate(&*state.store, body.user_id, "world_joined", None).await?
  } else {
    Vec::new()
  };

  let view = state
    .store
    .get_world(world.world_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("world {} not found", world.world_id)))?;
  Ok(Json(Awarded { item: view, new_achievements }))
}

// ─── Reads ───────────────────────────────────────────────────────────────────

/// `GET /worlds?user_id=<id>`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<UserParams>,
) -> Result<Json<Vec<World>>, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let worlds = state
    .store
    .list_worlds_for(params.user_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(worlds))
}

/// `GET /worlds/:id`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<WorldView>, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let view = state
    .store
    .get_world(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("world {id} not found")))?;
  Ok(Json(view))
}

// ─── Elements ────────────────────────────────────────────────────────────────

async fn require_member<S>(
  store: &S,
  world_id: Uuid,
  user_id: Uuid,
) -> Result<(), ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let member = store
    .is_world_member(world_id, user_id)
    .await
    .map_err(ApiError::store)?;
  if !member {
    return Err(ApiError::Forbidden(format!(
      "user {user_id} is not a member of world {world_id}"
    )));
  }
  Ok(())
}

/// `GET /worlds/:id/elements`
pub async fn list_elements<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<WorldElement>>, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  state
    .store
    .get_world(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("world {id} not found")))?;

  let elements = state
    .store
    .list_world_elements(id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(elements))
}

#[derive(Debug, Deserialize)]
pub struct ElementBody {
  pub author_id:   Uuid,
  pub kind:        String,
  pub name:        String,
  pub description: String,
}

/// `POST /worlds/:id/elements`
pub async fn create_element<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ElementBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if body.name.trim().is_empty() {
    return Err(ApiError::BadRequest("name must not be empty".into()));
  }
  state
    .store
    .get_world(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("world {id} not found")))?;
  require_member(&*state.store, id, body.author_id).await?;

  let element = state
    .store
    .add_world_element(NewWorldElement {
      world_id:    id,
      author_id:   body.author_id,
      kind:        body.kind,
      name:        body.name,
      description: body.description,
    })
    .await
    .map_err(ApiError::store)?;

  let new_achievements =
    evaluate(&*state.store, element.author_id, "world_element", None).await?;
  Ok((
    StatusCode::CREATED,
    Json(Awarded { item: element, new_achievements }),
  ))
}
