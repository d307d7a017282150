//! User goals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A goal the user has set for themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
  pub goal_id:      Uuid,
  pub user_id:      Uuid,
  pub title:        String,
  pub description:  Option<String>,
  pub completed:    bool,
  pub created_at:   DateTime<Utc>,
  pub completed_at: Option<DateTime<Utc>>,
}

/// Input to [`crate::store::CompanionStore::add_goal`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewGoal {
  pub user_id:     Uuid,
  pub title:       String,
  pub description: Option<String>,
}
