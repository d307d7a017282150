//! [`SqliteStore`] — the SQLite implementation of [`CompanionStore`].

use std::path::Path;

use chrono::{NaiveDate, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use npc_core::{
  achievement::{Achievement, ActivityCounts, ActivityEntry, Milestone},
  chat::{ChatMessage, ChatSession, MessageRole},
  checkin::{Checkin, NewCheckin},
  goal::{Goal, NewGoal},
  museum::{MuseumItem, NewMuseumItem},
  parent::{ParentConnection, ParentReport, ReportSummary},
  store::CompanionStore,
  user::{NewUser, User, UserUpdate},
  world::{NewWorld, NewWorldElement, World, WorldElement, WorldView},
};

use crate::{
  encode::{
    encode_date, encode_dt, encode_interests, encode_role, encode_summary,
    encode_uuid, RawAchievement, RawCheckin, RawGoal, RawMessage, RawMilestone,
    RawMuseumItem, RawParentConnection, RawParentReport, RawSession, RawUser,
    RawWorld, RawWorldElement,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An npc companion store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Row-mapping helpers ─────────────────────────────────────────────────────

const USER_COLS: &str = "user_id, created_at, name, age, pronouns, interests, \
                         companion_name, companion_persona";

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawUser> {
  Ok(RawUser {
    user_id:           row.get(0)?,
    created_at:        row.get(1)?,
    name:              row.get(2)?,
    age:               row.get(3)?,
    pronouns:          row.get(4)?,
    interests:         row.get(5)?,
    companion_name:    row.get(6)?,
    companion_persona: row.get(7)?,
  })
}

const CHECKIN_COLS: &str =
  "checkin_id, user_id, checked_on, mood, prompt, response, created_at";

fn checkin_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawCheckin> {
  Ok(RawCheckin {
    checkin_id: row.get(0)?,
    user_id:    row.get(1)?,
    checked_on: row.get(2)?,
    mood:       row.get(3)?,
    prompt:     row.get(4)?,
    response:   row.get(5)?,
    created_at: row.get(6)?,
  })
}

const GOAL_COLS: &str =
  "goal_id, user_id, title, description, completed, created_at, completed_at";

fn goal_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawGoal> {
  Ok(RawGoal {
    goal_id:      row.get(0)?,
    user_id:      row.get(1)?,
    title:        row.get(2)?,
    description:  row.get(3)?,
    completed:    row.get(4)?,
    created_at:   row.get(5)?,
    completed_at: row.get(6)?,
  })
}

const WORLD_COLS: &str =
  "world_id, owner_id, name, description, invite_code, created_at";

fn world_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawWorld> {
  Ok(RawWorld {
    world_id:    row.get(0)?,
    owner_id:    row.get(1)?,
    name:        row.get(2)?,
    description: row.get(3)?,
    invite_code: row.get(4)?,
    created_at:  row.get(5)?,
  })
}

const CONNECTION_COLS: &str = "connection_id, user_id, parent_email, \
                               token_hash, verified, created_at, verified_at";

fn connection_from_row(
  row: &rusqlite::Row<'_>,
) -> rusqlite::Result<RawParentConnection> {
  Ok(RawParentConnection {
    connection_id: row.get(0)?,
    user_id:       row.get(1)?,
    parent_email:  row.get(2)?,
    token_hash:    row.get(3)?,
    verified:      row.get(4)?,
    created_at:    row.get(5)?,
    verified_at:   row.get(6)?,
  })
}

// ─── CompanionStore impl ─────────────────────────────────────────────────────

impl CompanionStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn add_user(&self, input: NewUser) -> Result<User> {
    let user = User {
      user_id:           Uuid::new_v4(),
      created_at:        Utc::now(),
      name:              input.name,
      age:               input.age,
      pronouns:          input.pronouns,
      interests:         input.interests,
      companion_name:    input.companion_name,
      companion_persona: input.companion_persona,
    };

    let id_str        = encode_uuid(user.user_id);
    let at_str        = encode_dt(user.created_at);
    let name          = user.name.clone();
    let age           = user.age.map(i64::from);
    let pronouns      = user.pronouns.clone();
    let interests_str = encode_interests(&user.interests)?;
    let comp_name     = user.companion_name.clone();
    let comp_persona  = user.companion_persona.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (user_id, created_at, name, age, pronouns,
                              interests, companion_name, companion_persona)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id_str, at_str, name, age, pronouns, interests_str, comp_name,
            comp_persona,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(user)
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {USER_COLS} FROM users WHERE user_id = ?1"),
            rusqlite::params![id_str],
            user_from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn update_user(&self, id: Uuid, update: UserUpdate) -> Result<Option<User>> {
    let existing = match self.get_user(id).await? {
      Some(u) => u,
      None => return Ok(None),
    };
    let updated = update.apply(existing);

    let id_str        = encode_uuid(id);
    let name          = updated.name.clone();
    let age           = updated.age.map(i64::from);
    let pronouns      = updated.pronouns.clone();
    let interests_str = encode_interests(&updated.interests)?;
    let comp_name     = updated.companion_name.clone();
    let comp_persona  = updated.companion_persona.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE users
             SET name = ?2, age = ?3, pronouns = ?4, interests = ?5,
                 companion_name = ?6, companion_persona = ?7
           WHERE user_id = ?1",
          rusqlite::params![
            id_str, name, age, pronouns, interests_str, comp_name, comp_persona,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(Some(updated))
  }

  async fn delete_user(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let deleted: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let exists: bool = tx
          .query_row(
            "SELECT 1 FROM users WHERE user_id = ?1",
            rusqlite::params![id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        if !exists {
          return Ok(false);
        }

        // Children first, respecting FK dependencies. Owned worlds take
        // their elements and memberships with them.
        tx.execute(
          "DELETE FROM parent_reports WHERE connection_id IN
             (SELECT connection_id FROM parent_connections WHERE user_id = ?1)",
          rusqlite::params![id_str],
        )?;
        tx.execute(
          "DELETE FROM parent_connections WHERE user_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.execute(
          "DELETE FROM world_elements WHERE author_id = ?1 OR world_id IN
             (SELECT world_id FROM worlds WHERE owner_id = ?1)",
          rusqlite::params![id_str],
        )?;
        tx.execute(
          "DELETE FROM world_members WHERE user_id = ?1 OR world_id IN
             (SELECT world_id FROM worlds WHERE owner_id = ?1)",
          rusqlite::params![id_str],
        )?;
        tx.execute(
          "DELETE FROM worlds WHERE owner_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.execute(
          "DELETE FROM chat_messages WHERE session_id IN
             (SELECT session_id FROM chat_sessions WHERE user_id = ?1)",
          rusqlite::params![id_str],
        )?;
        tx.execute(
          "DELETE FROM chat_sessions WHERE user_id = ?1",
          rusqlite::params![id_str],
        )?;
        for table in [
          "daily_checkins",
          "user_goals",
          "museum_items",
          "achievements",
          "milestones",
          "activity_log",
          "daily_activity",
        ] {
          tx.execute(
            &format!("DELETE FROM {table} WHERE user_id = ?1"),
            rusqlite::params![id_str],
          )?;
        }
        tx.execute(
          "DELETE FROM users WHERE user_id = ?1",
          rusqlite::params![id_str],
        )?;

        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(deleted)
  }

  // ── Chat ──────────────────────────────────────────────────────────────────

  async fn add_session(
    &self,
    user_id: Uuid,
    title: Option<String>,
  ) -> Result<ChatSession> {
    let session = ChatSession {
      session_id: Uuid::new_v4(),
      user_id,
      title,
      created_at: Utc::now(),
    };

    let id_str      = encode_uuid(session.session_id);
    let user_id_str = encode_uuid(user_id);
    let title_col   = session.title.clone();
    let at_str      = encode_dt(session.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO chat_sessions (session_id, user_id, title, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, user_id_str, title_col, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(session)
  }

  async fn get_session(&self, id: Uuid) -> Result<Option<ChatSession>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawSession> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT session_id, user_id, title, created_at
             FROM chat_sessions WHERE session_id = ?1",
            rusqlite::params![id_str],
            |row| {
              Ok(RawSession {
                session_id: row.get(0)?,
                user_id:    row.get(1)?,
                title:      row.get(2)?,
                created_at: row.get(3)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSession::into_session).transpose()
  }

  async fn list_sessions(&self, user_id: Uuid) -> Result<Vec<ChatSession>> {
    let user_id_str = encode_uuid(user_id);

    let raws: Vec<RawSession> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT session_id, user_id, title, created_at
           FROM chat_sessions WHERE user_id = ?1
           ORDER BY created_at DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_id_str], |row| {
            Ok(RawSession {
              session_id: row.get(0)?,
              user_id:    row.get(1)?,
              title:      row.get(2)?,
              created_at: row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSession::into_session).collect()
  }

  async fn add_message(
    &self,
    session_id: Uuid,
    role: MessageRole,
    content: String,
  ) -> Result<ChatMessage> {
    let message = ChatMessage {
      message_id: Uuid::new_v4(),
      session_id,
      role,
      content,
      created_at: Utc::now(),
    };

    let id_str         = encode_uuid(message.message_id);
    let session_id_str = encode_uuid(session_id);
    let role_str       = encode_role(role).to_owned();
    let content_col    = message.content.clone();
    let at_str         = encode_dt(message.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO chat_messages (message_id, session_id, role, content, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, session_id_str, role_str, content_col, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(message)
  }

  async fn list_messages(&self, session_id: Uuid) -> Result<Vec<ChatMessage>> {
    let session_id_str = encode_uuid(session_id);

    let raws: Vec<RawMessage> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT message_id, session_id, role, content, created_at
           FROM chat_messages WHERE session_id = ?1
           ORDER BY created_at ASC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![session_id_str], |row| {
            Ok(RawMessage {
              message_id: row.get(0)?,
              session_id: row.get(1)?,
              role:       row.get(2)?,
              content:    row.get(3)?,
              created_at: row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMessage::into_message).collect()
  }

  // ── Check-ins ─────────────────────────────────────────────────────────────

  async fn upsert_checkin(&self, input: NewCheckin) -> Result<Checkin> {
    let checkin = Checkin {
      checkin_id: Uuid::new_v4(),
      user_id:    input.user_id,
      checked_on: input.checked_on,
      mood:       input.mood,
      prompt:     input.prompt,
      response:   input.response,
      created_at: Utc::now(),
    };

    let id_str      = encode_uuid(checkin.checkin_id);
    let user_id_str = encode_uuid(checkin.user_id);
    let on_str      = encode_date(checkin.checked_on);
    let mood        = checkin.mood.clone();
    let prompt      = checkin.prompt.clone();
    let response    = checkin.response.clone();
    let at_str      = encode_dt(checkin.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO daily_checkins
             (checkin_id, user_id, checked_on, mood, prompt, response, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
           ON CONFLICT (user_id, checked_on) DO UPDATE SET
             checkin_id = excluded.checkin_id,
             mood       = excluded.mood,
             prompt     = excluded.prompt,
             response   = excluded.response,
             created_at = excluded.created_at",
          rusqlite::params![id_str, user_id_str, on_str, mood, prompt, response, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(checkin)
  }

  async fn get_checkin(&self, user_id: Uuid, on: NaiveDate) -> Result<Option<Checkin>> {
    let user_id_str = encode_uuid(user_id);
    let on_str      = encode_date(on);

    let raw: Option<RawCheckin> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {CHECKIN_COLS} FROM daily_checkins
               WHERE user_id = ?1 AND checked_on = ?2"
            ),
            rusqlite::params![user_id_str, on_str],
            checkin_from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawCheckin::into_checkin).transpose()
  }

  async fn list_checkins(&self, user_id: Uuid) -> Result<Vec<Checkin>> {
    let user_id_str = encode_uuid(user_id);

    let raws: Vec<RawCheckin> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CHECKIN_COLS} FROM daily_checkins
           WHERE user_id = ?1 ORDER BY checked_on DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user_id_str], checkin_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCheckin::into_checkin).collect()
  }

  async fn checkin_dates(&self, user_id: Uuid) -> Result<Vec<NaiveDate>> {
    let user_id_str = encode_uuid(user_id);

    let dates: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT checked_on FROM daily_checkins
           WHERE user_id = ?1 ORDER BY checked_on DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_id_str], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    dates.iter().map(|s| crate::encode::decode_date(s)).collect()
  }

  // ── Goals ─────────────────────────────────────────────────────────────────

  async fn add_goal(&self, input: NewGoal) -> Result<Goal> {
    let goal = Goal {
      goal_id:      Uuid::new_v4(),
      user_id:      input.user_id,
      title:        input.title,
      description:  input.description,
      completed:    false,
      created_at:   Utc::now(),
      completed_at: None,
    };

    let id_str      = encode_uuid(goal.goal_id);
    let user_id_str = encode_uuid(goal.user_id);
    let title       = goal.title.clone();
    let description = goal.description.clone();
    let at_str      = encode_dt(goal.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO user_goals (goal_id, user_id, title, description, completed, created_at)
           VALUES (?1, ?2, ?3, ?4, 0, ?5)",
          rusqlite::params![id_str, user_id_str, title, description, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(goal)
  }

  async fn list_goals(&self, user_id: Uuid) -> Result<Vec<Goal>> {
    let user_id_str = encode_uuid(user_id);

    let raws: Vec<RawGoal> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {GOAL_COLS} FROM user_goals
           WHERE user_id = ?1 ORDER BY created_at DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user_id_str], goal_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawGoal::into_goal).collect()
  }

  async fn complete_goal(&self, id: Uuid) -> Result<Option<Goal>> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(Utc::now());

    let raw: Option<RawGoal> = self
      .conn
      .call(move |conn| {
        // COALESCE keeps the original completion time on repeat calls.
        conn.execute(
          "UPDATE user_goals
             SET completed = 1, completed_at = COALESCE(completed_at, ?2)
           WHERE goal_id = ?1",
          rusqlite::params![id_str, at_str],
        )?;
        Ok(
          conn
            .query_row(
              &format!("SELECT {GOAL_COLS} FROM user_goals WHERE goal_id = ?1"),
              rusqlite::params![id_str],
              goal_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawGoal::into_goal).transpose()
  }

  async fn delete_goal(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let n: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM user_goals WHERE goal_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    Ok(n > 0)
  }

  // ── Museum ────────────────────────────────────────────────────────────────

  async fn add_museum_item(&self, input: NewMuseumItem) -> Result<MuseumItem> {
    let item = MuseumItem {
      item_id:    Uuid::new_v4(),
      user_id:    input.user_id,
      title:      input.title,
      insight:    input.insight,
      wing:       input.wing,
      created_at: Utc::now(),
    };

    let id_str      = encode_uuid(item.item_id);
    let user_id_str = encode_uuid(item.user_id);
    let title       = item.title.clone();
    let insight     = item.insight.clone();
    let wing        = item.wing.clone();
    let at_str      = encode_dt(item.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO museum_items (item_id, user_id, title, insight, wing, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, user_id_str, title, insight, wing, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(item)
  }

  async fn list_museum_items(
    &self,
    user_id: Uuid,
    wing: Option<String>,
  ) -> Result<Vec<MuseumItem>> {
    let user_id_str = encode_uuid(user_id);

    let raws: Vec<RawMuseumItem> = self
      .conn
      .call(move |conn| {
        let map = |row: &rusqlite::Row<'_>| {
          Ok(RawMuseumItem {
            item_id:    row.get(0)?,
            user_id:    row.get(1)?,
            title:      row.get(2)?,
            insight:    row.get(3)?,
            wing:       row.get(4)?,
            created_at: row.get(5)?,
          })
        };
        let rows = if let Some(w) = wing {
          let mut stmt = conn.prepare(
            "SELECT item_id, user_id, title, insight, wing, created_at
             FROM museum_items WHERE user_id = ?1 AND wing = ?2
             ORDER BY created_at DESC",
          )?;
          stmt
            .query_map(rusqlite::params![user_id_str, w], map)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(
            "SELECT item_id, user_id, title, insight, wing, created_at
             FROM museum_items WHERE user_id = ?1
             ORDER BY created_at DESC",
          )?;
          stmt
            .query_map(rusqlite::params![user_id_str], map)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMuseumItem::into_item).collect()
  }

  async fn delete_museum_item(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let n: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM museum_items WHERE item_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    Ok(n > 0)
  }

  // ── Worlds ────────────────────────────────────────────────────────────────

  async fn add_world(&self, input: NewWorld) -> Result<World> {
    let world = World {
      world_id:    Uuid::new_v4(),
      owner_id:    input.owner_id,
      name:        input.name,
      description: input.description,
      invite_code: input.invite_code,
      created_at:  Utc::now(),
    };

    let id_str      = encode_uuid(world.world_id);
    let owner_str   = encode_uuid(world.owner_id);
    let name        = world.name.clone();
    let description = world.description.clone();
    let invite      = world.invite_code.clone();
    let at_str      = encode_dt(world.created_at);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO worlds (world_id, owner_id, name, description, invite_code, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, owner_str, name, description, invite, at_str],
        )?;
        // The owner is always the first member.
        tx.execute(
          "INSERT INTO world_members (world_id, user_id, joined_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, owner_str, at_str],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(world)
  }

  async fn find_world_by_invite(&self, code: String) -> Result<Option<World>> {
    let raw: Option<RawWorld> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {WORLD_COLS} FROM worlds WHERE invite_code = ?1"),
            rusqlite::params![code],
            world_from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawWorld::into_world).transpose()
  }

  async fn get_world(&self, id: Uuid) -> Result<Option<WorldView>> {
    let id_str = encode_uuid(id);

    let raw: Option<(RawWorld, i64)> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {WORLD_COLS},
                 (SELECT COUNT(*) FROM world_members m WHERE m.world_id = worlds.world_id)
               FROM worlds WHERE world_id = ?1"
            ),
            rusqlite::params![id_str],
            |row| Ok((world_from_row(row)?, row.get(6)?)),
          )
          .optional()?)
      })
      .await?;

    raw
      .map(|(raw_world, count)| {
        Ok(WorldView {
          world:        raw_world.into_world()?,
          member_count: count as u32,
        })
      })
      .transpose()
  }

  async fn list_worlds_for(&self, user_id: Uuid) -> Result<Vec<World>> {
    let user_id_str = encode_uuid(user_id);

    let raws: Vec<RawWorld> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {WORLD_COLS} FROM worlds
           JOIN world_members USING (world_id)
           WHERE world_members.user_id = ?1
           ORDER BY world_members.joined_at DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user_id_str], world_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawWorld::into_world).collect()
  }

  async fn join_world(&self, world_id: Uuid, user_id: Uuid) -> Result<bool> {
    let world_str = encode_uuid(world_id);
    let user_str  = encode_uuid(user_id);
    let at_str    = encode_dt(Utc::now());

    let n: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO world_members (world_id, user_id, joined_at)
           VALUES (?1, ?2, ?3)
           ON CONFLICT (world_id, user_id) DO NOTHING",
          rusqlite::params![world_str, user_str, at_str],
        )?)
      })
      .await?;

    Ok(n > 0)
  }

  async fn is_world_member(&self, world_id: Uuid, user_id: Uuid) -> Result<bool> {
    let world_str = encode_uuid(world_id);
    let user_str  = encode_uuid(user_id);

    let member: bool = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM world_members WHERE world_id = ?1 AND user_id = ?2",
              rusqlite::params![world_str, user_str],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;

    Ok(member)
  }

  async fn add_world_element(&self, input: NewWorldElement) -> Result<WorldElement> {
    let element = WorldElement {
      element_id:  Uuid::new_v4(),
      world_id:    input.world_id,
      author_id:   input.author_id,
      kind:        input.kind,
      name:        input.name,
      description: input.description,
      created_at:  Utc::now(),
    };

    let id_str     = encode_uuid(element.element_id);
    let world_str  = encode_uuid(element.world_id);
    let author_str = encode_uuid(element.author_id);
    let kind       = element.kind.clone();
    let name       = element.name.clone();
    let desc       = element.description.clone();
    let at_str     = encode_dt(element.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO world_elements
             (element_id, world_id, author_id, kind, name, description, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![id_str, world_str, author_str, kind, name, desc, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(element)
  }

  async fn list_world_elements(&self, world_id: Uuid) -> Result<Vec<WorldElement>> {
    let world_str = encode_uuid(world_id);

    let raws: Vec<RawWorldElement> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT element_id, world_id, author_id, kind, name, description, created_at
           FROM world_elements WHERE world_id = ?1
           ORDER BY created_at ASC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![world_str], |row| {
            Ok(RawWorldElement {
              element_id:  row.get(0)?,
              world_id:    row.get(1)?,
              author_id:   row.get(2)?,
              kind:        row.get(3)?,
              name:        row.get(4)?,
              description: row.get(5)?,
              created_at:  row.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawWorldElement::into_element).collect()
  }

  // ── Achievements & activity ───────────────────────────────────────────────

  async fn grant_achievement(
    &self,
    user_id: Uuid,
    code: String,
  ) -> Result<Option<Achievement>> {
    let achievement = Achievement {
      achievement_id: Uuid::new_v4(),
      user_id,
      code,
      earned_at: Utc::now(),
    };

    let id_str   = encode_uuid(achievement.achievement_id);
    let user_str = encode_uuid(user_id);
    let code_col = achievement.code.clone();
    let at_str   = encode_dt(achievement.earned_at);

    let inserted: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO achievements (achievement_id, user_id, code, earned_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (user_id, code) DO NOTHING",
          rusqlite::params![id_str, user_str, code_col, at_str],
        )?)
      })
      .await?;

    Ok((inserted > 0).then_some(achievement))
  }

  async fn list_achievements(&self, user_id: Uuid) -> Result<Vec<Achievement>> {
    let user_str = encode_uuid(user_id);

    let raws: Vec<RawAchievement> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT achievement_id, user_id, code, earned_at
           FROM achievements WHERE user_id = ?1
           ORDER BY earned_at ASC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_str], |row| {
            Ok(RawAchievement {
              achievement_id: row.get(0)?,
              user_id:        row.get(1)?,
              code:           row.get(2)?,
              earned_at:      row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawAchievement::into_achievement)
      .collect()
  }

  async fn record_milestone(&self, user_id: Uuid, label: String) -> Result<Milestone> {
    let milestone = Milestone {
      milestone_id: Uuid::new_v4(),
      user_id,
      label,
      achieved_at: Utc::now(),
    };

    let id_str    = encode_uuid(milestone.milestone_id);
    let user_str  = encode_uuid(user_id);
    let label_col = milestone.label.clone();
    let at_str    = encode_dt(milestone.achieved_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO milestones (milestone_id, user_id, label, achieved_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, user_str, label_col, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(milestone)
  }

  async fn list_milestones(&self, user_id: Uuid) -> Result<Vec<Milestone>> {
    let user_str = encode_uuid(user_id);

    let raws: Vec<RawMilestone> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT milestone_id, user_id, label, achieved_at
           FROM milestones WHERE user_id = ?1
           ORDER BY achieved_at ASC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_str], |row| {
            Ok(RawMilestone {
              milestone_id: row.get(0)?,
              user_id:      row.get(1)?,
              label:        row.get(2)?,
              achieved_at:  row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMilestone::into_milestone).collect()
  }

  async fn log_activity(
    &self,
    user_id: Uuid,
    kind: String,
    detail: Option<String>,
  ) -> Result<ActivityEntry> {
    let entry = ActivityEntry {
      entry_id: Uuid::new_v4(),
      user_id,
      kind,
      detail,
      created_at: Utc::now(),
    };

    let id_str     = encode_uuid(entry.entry_id);
    let user_str   = encode_uuid(user_id);
    let kind_col   = entry.kind.clone();
    let detail_col = entry.detail.clone();
    let at_str     = encode_dt(entry.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO activity_log (entry_id, user_id, kind, detail, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, user_str, kind_col, detail_col, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(entry)
  }

  async fn bump_daily_activity(&self, user_id: Uuid, day: NaiveDate) -> Result<u32> {
    let user_str = encode_uuid(user_id);
    let day_str  = encode_date(day);

    let count: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO daily_activity (user_id, day, count) VALUES (?1, ?2, 1)
           ON CONFLICT (user_id, day) DO UPDATE SET count = count + 1",
          rusqlite::params![user_str, day_str],
        )?;
        Ok(conn.query_row(
          "SELECT count FROM daily_activity WHERE user_id = ?1 AND day = ?2",
          rusqlite::params![user_str, day_str],
          |row| row.get(0),
        )?)
      })
      .await?;

    Ok(count as u32)
  }

  async fn activity_counts(&self, user_id: Uuid) -> Result<ActivityCounts> {
    let user_str = encode_uuid(user_id);

    let counts: ActivityCounts = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT
             (SELECT COUNT(*) FROM chat_messages m
                JOIN chat_sessions s ON s.session_id = m.session_id
              WHERE s.user_id = ?1 AND m.role = 'user'),
             (SELECT COUNT(*) FROM daily_checkins WHERE user_id = ?1),
             (SELECT COUNT(*) FROM museum_items   WHERE user_id = ?1),
             (SELECT COUNT(*) FROM user_goals     WHERE user_id = ?1),
             (SELECT COUNT(*) FROM user_goals     WHERE user_id = ?1 AND completed = 1),
             (SELECT COUNT(*) FROM world_members  WHERE user_id = ?1),
             (SELECT COUNT(*) FROM world_elements WHERE author_id = ?1)",
          rusqlite::params![user_str],
          |row| {
            Ok(ActivityCounts {
              chat_messages:   row.get::<_, i64>(0)? as u32,
              checkins:        row.get::<_, i64>(1)? as u32,
              museum_items:    row.get::<_, i64>(2)? as u32,
              goals_created:   row.get::<_, i64>(3)? as u32,
              goals_completed: row.get::<_, i64>(4)? as u32,
              worlds_joined:   row.get::<_, i64>(5)? as u32,
              world_elements:  row.get::<_, i64>(6)? as u32,
            })
          },
        )?)
      })
      .await?;

    Ok(counts)
  }

  // ── Parents ───────────────────────────────────────────────────────────────

  async fn add_parent_connection(
    &self,
    user_id: Uuid,
    parent_email: String,
    token_hash: String,
  ) -> Result<ParentConnection> {
    let connection = ParentConnection {
      connection_id: Uuid::new_v4(),
      user_id,
      parent_email,
      token_hash,
      verified: false,
      created_at: Utc::now(),
      verified_at: None,
    };

    let id_str    = encode_uuid(connection.connection_id);
    let user_str  = encode_uuid(user_id);
    let email_col = connection.parent_email.clone();
    let hash_col  = connection.token_hash.clone();
    let at_str    = encode_dt(connection.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO parent_connections
             (connection_id, user_id, parent_email, token_hash, verified, created_at)
           VALUES (?1, ?2, ?3, ?4, 0, ?5)",
          rusqlite::params![id_str, user_str, email_col, hash_col, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(connection)
  }

  async fn verify_parent_connection(
    &self,
    hash: String,
  ) -> Result<Option<ParentConnection>> {
    let at_str = encode_dt(Utc::now());

    let raw: Option<RawParentConnection> = self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE parent_connections
             SET verified = 1, verified_at = COALESCE(verified_at, ?2)
           WHERE token_hash = ?1",
          rusqlite::params![hash, at_str],
        )?;
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {CONNECTION_COLS} FROM parent_connections
                 WHERE token_hash = ?1"
              ),
              rusqlite::params![hash],
              connection_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawParentConnection::into_connection).transpose()
  }

  async fn get_parent_connection(&self, id: Uuid) -> Result<Option<ParentConnection>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawParentConnection> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {CONNECTION_COLS} FROM parent_connections
                 WHERE connection_id = ?1"
              ),
              rusqlite::params![id_str],
              connection_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawParentConnection::into_connection).transpose()
  }

  async fn list_parent_connections(&self, user_id: Uuid) -> Result<Vec<ParentConnection>> {
    let user_str = encode_uuid(user_id);

    let raws: Vec<RawParentConnection> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CONNECTION_COLS} FROM parent_connections
           WHERE user_id = ?1 ORDER BY created_at ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user_str], connection_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawParentConnection::into_connection)
      .collect()
  }

  async fn report_summary(
    &self,
    user_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result<ReportSummary> {
    let user_str  = encode_uuid(user_id);
    let start_str = encode_date(start);
    let end_str   = encode_date(end);

    let summary: ReportSummary = self
      .conn
      .call(move |conn| {
        // RFC 3339 UTC timestamps sort lexicographically, so the calendar
        // day is just the first ten characters.
        Ok(conn.query_row(
          "SELECT
             (SELECT COUNT(*) FROM daily_checkins
              WHERE user_id = ?1 AND checked_on BETWEEN ?2 AND ?3),
             (SELECT COUNT(*) FROM chat_messages m
                JOIN chat_sessions s ON s.session_id = m.session_id
              WHERE s.user_id = ?1 AND m.role = 'user'
                AND substr(m.created_at, 1, 10) BETWEEN ?2 AND ?3),
             (SELECT COUNT(*) FROM user_goals
              WHERE user_id = ?1 AND completed = 1
                AND substr(completed_at, 1, 10) BETWEEN ?2 AND ?3),
             (SELECT COUNT(*) FROM achievements
              WHERE user_id = ?1
                AND substr(earned_at, 1, 10) BETWEEN ?2 AND ?3)",
          rusqlite::params![user_str, start_str, end_str],
          |row| {
            Ok(ReportSummary {
              checkins:        row.get::<_, i64>(0)? as u32,
              chat_messages:   row.get::<_, i64>(1)? as u32,
              goals_completed: row.get::<_, i64>(2)? as u32,
              achievements:    row.get::<_, i64>(3)? as u32,
            })
          },
        )?)
      })
      .await?;

    Ok(summary)
  }

  async fn add_parent_report(
    &self,
    connection_id: Uuid,
    period_start: NaiveDate,
    period_end: NaiveDate,
    summary: ReportSummary,
  ) -> Result<ParentReport> {
    let report = ParentReport {
      report_id: Uuid::new_v4(),
      connection_id,
      period_start,
      period_end,
      summary,
      created_at: Utc::now(),
    };

    let id_str      = encode_uuid(report.report_id);
    let conn_str    = encode_uuid(connection_id);
    let start_str   = encode_date(period_start);
    let end_str     = encode_date(period_end);
    let summary_str = encode_summary(&summary)?;
    let at_str      = encode_dt(report.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO parent_reports
             (report_id, connection_id, period_start, period_end, summary_json, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, conn_str, start_str, end_str, summary_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(report)
  }

  async fn list_parent_reports(&self, connection_id: Uuid) -> Result<Vec<ParentReport>> {
    let conn_str = encode_uuid(connection_id);

    let raws: Vec<RawParentReport> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT report_id, connection_id, period_start, period_end, summary_json, created_at
           FROM parent_reports WHERE connection_id = ?1
           ORDER BY created_at DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![conn_str], |row| {
            Ok(RawParentReport {
              report_id:     row.get(0)?,
              connection_id: row.get(1)?,
              period_start:  row.get(2)?,
              period_end:    row.get(3)?,
              summary_json:  row.get(4)?,
              created_at:    row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawParentReport::into_report).collect()
  }
}
