//! Museum items — user-curated collectibles.
//!
//! Each item records a reflective insight the user chose to keep; the
//! frontend groups items by `wing` for the gift-shop display.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One exhibit in a user's museum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MuseumItem {
  pub item_id:    Uuid,
  pub user_id:    Uuid,
  pub title:      String,
  /// The reflective insight this item commemorates.
  pub insight:    String,
  /// Display category, e.g. "courage", "friendship".
  pub wing:       String,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::CompanionStore::add_museum_item`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewMuseumItem {
  pub user_id: Uuid,
  pub title:   String,
  pub insight: String,
  pub wing:    String,
}
