//! Handlers for `/parents` endpoints — magic-link connections and weekly
//! reports.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/parents/connections` | Emails a magic link to the parent |
//! | `POST` | `/parents/verify` | Body: `{"token":"<hex>"}`; 401 on unknown token |
//! | `GET`  | `/parents/connections?user_id=<id>` | |
//! | `POST` | `/parents/reports` | Verified connections only (403 otherwise) |
//! | `GET`  | `/parents/reports?connection_id=<id>` | |
//!
//! Raw connect tokens exist only inside the emailed link; the store holds
//! SHA-256 digests.

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{Days, Utc};
use npc_core::{
  parent::{ParentConnection, ParentReport},
  store::CompanionStore,
};
use npc_mailer::template;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState,
  error::ApiError,
  progress::{UserParams, require_user},
  token,
};

// ─── Connections ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateConnectionBody {
  pub user_id:      Uuid,
  pub parent_email: String,
}

/// `POST /parents/connections`
pub async fn create_connection<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<CreateConnectionBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let email = body.parent_email.trim().to_lowercase();
  if !email.contains('@') {
    return Err(ApiError::BadRequest(format!("invalid email: {email:?}")));
  }
  let user = require_user(&*state.store, body.user_id).await?;

  let connect_token = token::connect_token();
  let connection = state
    .store
    .add_parent_connection(body.user_id, email.clone(), token::digest(&connect_token))
    .await
    .map_err(ApiError::store)?;

  let verify_url = format!(
    "{}/parents/verify?token={connect_token}",
    state.public_base_url
  );
  state
    .mailer
    .send(template::magic_link(&email, &user.name, &verify_url))
    .await?;

  tracing::info!(user_id = %body.user_id, "parent connection created, magic link sent");
  Ok((StatusCode::CREATED, Json(connection)))
}

#[derive(Debug, Deserialize)]
pub struct VerifyBody {
  pub token: String,
}

/// `POST /parents/verify`
pub async fn verify<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<VerifyBody>,
) -> Result<Json<ParentConnection>, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let connection = state
    .store
    .verify_parent_connection(token::digest(body.token.trim()))
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::Unauthorized("unknown or expired token".into()))?;
  Ok(Json(connection))
}

/// `GET /parents/connections?user_id=<id>`
pub async fn list_connections<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<UserParams>,
) -> Result<Json<Vec<ParentConnection>>, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let connections = state
    .store
    .list_parent_connections(params.user_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(connections))
}

// ─── Reports ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateReportBody {
  pub connection_id: Uuid,
}

/// `POST /parents/reports` — build and email the last week's summary.
pub async fn create_report<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<CreateReportBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let connection = state
    .store
    .get_parent_connection(body.connection_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!("connection {} not found", body.connection_id))
    })?;
  if !connection.verified {
    return Err(ApiError::Forbidden(
      "parent connection has not been verified".into(),
    ));
  }

  let end = Utc::now().date_naive();
  let start = end - Days::new(6);

  let summary = state
    .store
    .report_summary(connection.user_id, start, end)
    .await
    .map_err(ApiError::store)?;
  let report = state
    .store
    .add_parent_report(connection.connection_id, start, end, summary.clone())
    .await
    .map_err(ApiError::store)?;

  let user = require_user(&*state.store, connection.user_id).await?;
  state
    .mailer
    .send(template::weekly_report(
      &connection.parent_email,
      &user.name,
      start,
      end,
      &summary,
    ))
    .await?;

  Ok((StatusCode::CREATED, Json(report)))
}

#[derive(Debug, Deserialize)]
pub struct ReportParams {
  pub connection_id: Uuid,
}

/// `GET /parents/reports?connection_id=<id>`
pub async fn list_reports<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ReportParams>,
) -> Result<Json<Vec<ParentReport>>, ApiError>
where
  S: CompanionStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let reports = state
    .store
    .list_parent_reports(params.connection_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(reports))
}
