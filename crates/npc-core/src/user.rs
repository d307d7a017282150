//! User — the hub of the data model.
//!
//! Every other record in the store hangs off a user by foreign key. A user
//! carries the profile fields the chat companion's system prompt is built
//! from, plus the name/persona of the companion itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered user and their companion configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:           Uuid,
  pub created_at:        DateTime<Utc>,
  pub name:              String,
  pub age:               Option<u8>,
  pub pronouns:          Option<String>,
  /// Free-text interests, used verbatim in the system prompt.
  pub interests:         Vec<String>,
  /// Display name of the user's AI companion.
  pub companion_name:    String,
  /// Short persona description the companion should stay in character for.
  pub companion_persona: Option<String>,
}

/// Input to [`crate::store::CompanionStore::add_user`].
/// `user_id` and `created_at` are always assigned by the store.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
  pub name:              String,
  pub age:               Option<u8>,
  pub pronouns:          Option<String>,
  #[serde(default)]
  pub interests:         Vec<String>,
  pub companion_name:    String,
  pub companion_persona: Option<String>,
}

/// Partial profile update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
  pub name:              Option<String>,
  pub age:               Option<u8>,
  pub pronouns:          Option<String>,
  pub interests:         Option<Vec<String>>,
  pub companion_name:    Option<String>,
  pub companion_persona: Option<String>,
}

impl UserUpdate {
  /// `true` if the update would change nothing.
  pub fn is_empty(&self) -> bool {
    self.name.is_none()
      && self.age.is_none()
      && self.pronouns.is_none()
      && self.interests.is_none()
      && self.companion_name.is_none()
      && self.companion_persona.is_none()
  }

  /// Apply this update over an existing profile.
  pub fn apply(self, mut user: User) -> User {
    if let Some(v) = self.name              { user.name = v; }
    if let Some(v) = self.age               { user.age = Some(v); }
    if let Some(v) = self.pronouns          { user.pronouns = Some(v); }
    if let Some(v) = self.interests         { user.interests = v; }
    if let Some(v) = self.companion_name    { user.companion_name = v; }
    if let Some(v) = self.companion_persona { user.companion_persona = Some(v); }
    user
  }
}
