//! JSON REST API for npc.
//!
//! Exposes an axum [`Router`] backed by any [`npc_core::store::CompanionStore`],
//! a [`npc_llm::ChatModel`] and a [`npc_mailer::Mailer`]. Auth, TLS and
//! transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", npc_api::api_router(state))
//! ```

pub mod chat;
pub mod checkins;
pub mod error;
pub mod goals;
pub mod museum;
pub mod parents;
pub mod progress;
pub mod token;
pub mod users;
pub mod worlds;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use npc_core::store::CompanionStore;
use npc_llm::ChatModel;
use npc_mailer::Mailer;

pub use error::ApiError;

/// Shared state handed to every handler.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub model:  Arc<dyn ChatModel>,
  pub mailer: Arc<dyn Mailer>,
  /// Public base URL the frontend is served from; magic links are built
  /// against it.
  pub public_base_url: String,
}

// Derived Clone would demand S: Clone.
impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:           self.store.clone(),
      model:           self.model.clone(),
      mailer:          self.mailer.clone(),
      public_base_url: self.public_base_url.clone(),
    }
  }
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: CompanionStore + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    // Users
    .route("/users", post(users::create::<S>))
    .route(
      "/users/{id}",
      get(users::get_one::<S>)
        .patch(users::update::<S>)
        .delete(users::delete::<S>),
    )
    // Chat
    .route(
      "/chat/sessions",
      get(chat::list_sessions::<S>).post(chat::create_session::<S>),
    )
    .route(
      "/chat/sessions/{id}/messages",
      get(chat::list_messages::<S>).post(chat::post_message::<S>),
    )
    .route("/chat/sessions/{id}/stream", post(chat::stream::<S>))
    // Check-ins
    .route(
      "/checkins",
      get(checkins::list::<S>).post(checkins::create::<S>),
    )
    .route("/checkins/streak", get(checkins::streak::<S>))
    // Goals
    .route("/goals", get(goals::list::<S>).post(goals::create::<S>))
    .route("/goals/{id}/complete", post(goals::complete::<S>))
    .route("/goals/{id}", axum::routing::delete(goals::delete::<S>))
    // Museum
    .route("/museum", get(museum::list::<S>).post(museum::create::<S>))
    .route("/museum/{id}", axum::routing::delete(museum::delete::<S>))
    // Worlds
    .route("/worlds", get(worlds::list::<S>).post(worlds::create::<S>))
    .route("/worlds/join", post(worlds::join::<S>))
    .route("/worlds/{id}", get(worlds::get_one::<S>))
    .route(
      "/worlds/{id}/elements",
      get(worlds::list_elements::<S>).post(worlds::create_element::<S>),
    )
    // Progress
    .route("/activity", post(progress::record::<S>))
    .route("/achievements", get(progress::achievements::<S>))
    .route("/milestones", get(progress::milestones::<S>))
    // Parents
    .route(
      "/parents/connections",
      get(parents::list_connections::<S>).post(parents::create_connection::<S>),
    )
    .route("/parents/verify", post(parents::verify::<S>))
    .route(
      "/parents/reports",
      get(parents::list_reports::<S>).post(parents::create_report::<S>),
    )
    .with_state(state)
}
