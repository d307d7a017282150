//! Worlds — collaborative creative-writing workspaces.
//!
//! Access control is invite-code based: anyone holding a world's code can
//! enrol as a member. Only members may add elements. The owner is enrolled
//! automatically at creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A shared world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
  pub world_id:    Uuid,
  pub owner_id:    Uuid,
  pub name:        String,
  pub description: Option<String>,
  /// Short random code handed out by the owner; unique across worlds.
  pub invite_code: String,
  pub created_at:  DateTime<Utc>,
}

/// A world plus derived membership info, returned by point reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldView {
  #[serde(flatten)]
  pub world:        World,
  pub member_count: u32,
}

/// Input to [`crate::store::CompanionStore::add_world`].
/// The invite code is generated by the caller (the API layer) so the store
/// stays free of randomness.
#[derive(Debug, Clone)]
pub struct NewWorld {
  pub owner_id:    Uuid,
  pub name:        String,
  pub description: Option<String>,
  pub invite_code: String,
}

/// One piece of a world: a character, place, faction, or similar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldElement {
  pub element_id:  Uuid,
  pub world_id:    Uuid,
  pub author_id:   Uuid,
  /// Element category, e.g. "character", "location", "lore".
  pub kind:        String,
  pub name:        String,
  pub description: String,
  pub created_at:  DateTime<Utc>,
}

/// Input to [`crate::store::CompanionStore::add_world_element`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewWorldElement {
  pub world_id:    Uuid,
  pub author_id:   Uuid,
  pub kind:        String,
  pub name:        String,
  pub description: String,
}
