//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, calendar days are `YYYY-MM-DD`, UUIDs are
//! hyphenated lowercase strings, booleans are 0/1 integers, and structured
//! fields (interests, report summaries) are compact JSON.

use chrono::{DateTime, NaiveDate, Utc};
use npc_core::{
  achievement::{Achievement, Milestone},
  chat::{ChatMessage, ChatSession, MessageRole},
  checkin::Checkin,
  goal::Goal,
  museum::MuseumItem,
  parent::{ParentConnection, ParentReport, ReportSummary},
  user::User,
  world::{World, WorldElement},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  s.parse().map_err(|_| Error::DateParse(format!("bad date: {s:?}")))
}

pub fn encode_role(r: MessageRole) -> &'static str {
  match r {
    MessageRole::User => "user",
    MessageRole::Assistant => "assistant",
  }
}

pub fn decode_role(s: &str) -> Result<MessageRole> {
  match s {
    "user" => Ok(MessageRole::User),
    "assistant" => Ok(MessageRole::Assistant),
    other => Err(Error::Core(npc_core::Error::UnknownRole(other.to_string()))),
  }
}

pub fn encode_interests(interests: &[String]) -> Result<String> {
  Ok(serde_json::to_string(interests)?)
}

pub fn decode_interests(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_summary(s: &ReportSummary) -> Result<String> {
  Ok(serde_json::to_string(s)?)
}

pub fn decode_summary(s: &str) -> Result<ReportSummary> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub user_id:           String,
  pub created_at:        String,
  pub name:              String,
  pub age:               Option<i64>,
  pub pronouns:          Option<String>,
  pub interests:         String,
  pub companion_name:    String,
  pub companion_persona: Option<String>,
}

impl RawUser {
  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:           decode_uuid(&self.user_id)?,
      created_at:        decode_dt(&self.created_at)?,
      name:              self.name,
      age:               self.age.map(|a| a as u8),
      pronouns:          self.pronouns,
      interests:         decode_interests(&self.interests)?,
      companion_name:    self.companion_name,
      companion_persona: self.companion_persona,
    })
  }
}

pub struct RawSession {
  pub session_id: String,
  pub user_id:    String,
  pub title:      Option<String>,
  pub created_at: String,
}

impl RawSession {
  pub fn into_session(self) -> Result<ChatSession> {
    Ok(ChatSession {
      session_id: decode_uuid(&self.session_id)?,
      user_id:    decode_uuid(&self.user_id)?,
      title:      self.title,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawMessage {
  pub message_id: String,
  pub session_id: String,
  pub role:       String,
  pub content:    String,
  pub created_at: String,
}

impl RawMessage {
  pub fn into_message(self) -> Result<ChatMessage> {
    Ok(ChatMessage {
      message_id: decode_uuid(&self.message_id)?,
      session_id: decode_uuid(&self.session_id)?,
      role:       decode_role(&self.role)?,
      content:    self.content,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawCheckin {
  pub checkin_id: String,
  pub user_id:    String,
  pub checked_on: String,
  pub mood:       String,
  pub prompt:     String,
  pub response:   String,
  pub created_at: String,
}

impl RawCheckin {
  pub fn into_checkin(self) -> Result<Checkin> {
    Ok(Checkin {
      checkin_id: decode_uuid(&self.checkin_id)?,
      user_id:    decode_uuid(&self.user_id)?,
      checked_on: decode_date(&self.checked_on)?,
      mood:       self.mood,
      prompt:     self.prompt,
      response:   self.response,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawGoal {
  pub goal_id:      String,
  pub user_id:      String,
  pub title:        String,
  pub description:  Option<String>,
  pub completed:    i64,
  pub created_at:   String,
  pub completed_at: Option<String>,
}

impl RawGoal {
  pub fn into_goal(self) -> Result<Goal> {
    Ok(Goal {
      goal_id:      decode_uuid(&self.goal_id)?,
      user_id:      decode_uuid(&self.user_id)?,
      title:        self.title,
      description:  self.description,
      completed:    self.completed != 0,
      created_at:   decode_dt(&self.created_at)?,
      completed_at: self.completed_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

pub struct RawMuseumItem {
  pub item_id:    String,
  pub user_id:    String,
  pub title:      String,
  pub insight:    String,
  pub wing:       String,
  pub created_at: String,
}

impl RawMuseumItem {
  pub fn into_item(self) -> Result<MuseumItem> {
    Ok(MuseumItem {
      item_id:    decode_uuid(&self.item_id)?,
      user_id:    decode_uuid(&self.user_id)?,
      title:      self.title,
      insight:    self.insight,
      wing:       self.wing,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawWorld {
  pub world_id:    String,
  pub owner_id:    String,
  pub name:        String,
  pub description: Option<String>,
  pub invite_code: String,
  pub created_at:  String,
}

impl RawWorld {
  pub fn into_world(self) -> Result<World> {
    Ok(World {
      world_id:    decode_uuid(&self.world_id)?,
      owner_id:    decode_uuid(&self.owner_id)?,
      name:        self.name,
      description: self.description,
      invite_code: self.invite_code,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawWorldElement {
  pub element_id:  String,
  pub world_id:    String,
  pub author_id:   String,
  pub kind:        String,
  pub name:        String,
  pub description: String,
  pub created_at:  String,
}

impl RawWorldElement {
  pub fn into_element(self) -> Result<WorldElement> {
    Ok(WorldElement {
      element_id:  decode_uuid(&self.element_id)?,
      world_id:    decode_uuid(&self.world_id)?,
      author_id:   decode_uuid(&self.author_id)?,
      kind:        self.kind,
      name:        self.name,
      description: self.description,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawAchievement {
  pub achievement_id: String,
  pub user_id:        String,
  pub code:           String,
  pub earned_at:      String,
}

impl RawAchievement {
  pub fn into_achievement(self) -> Result<Achievement> {
    Ok(Achievement {
      achievement_id: decode_uuid(&self.achievement_id)?,
      user_id:        decode_uuid(&self.user_id)?,
      code:           self.code,
      earned_at:      decode_dt(&self.earned_at)?,
    })
  }
}

pub struct RawMilestone {
  pub milestone_id: String,
  pub user_id:      String,
  pub label:        String,
  pub achieved_at:  String,
}

impl RawMilestone {
  pub fn into_milestone(self) -> Result<Milestone> {
    Ok(Milestone {
      milestone_id: decode_uuid(&self.milestone_id)?,
      user_id:      decode_uuid(&self.user_id)?,
      label:        self.label,
      achieved_at:  decode_dt(&self.achieved_at)?,
    })
  }
}

pub struct RawParentConnection {
  pub connection_id: String,
  pub user_id:       String,
  pub parent_email:  String,
  pub token_hash:    String,
  pub verified:      i64,
  pub created_at:    String,
  pub verified_at:   Option<String>,
}

impl RawParentConnection {
  pub fn into_connection(self) -> Result<ParentConnection> {
    Ok(ParentConnection {
      connection_id: decode_uuid(&self.connection_id)?,
      user_id:       decode_uuid(&self.user_id)?,
      parent_email:  self.parent_email,
      token_hash:    self.token_hash,
      verified:      self.verified != 0,
      created_at:    decode_dt(&self.created_at)?,
      verified_at:   self.verified_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

pub struct RawParentReport {
  pub report_id:     String,
  pub connection_id: String,
  pub period_start:  String,
  pub period_end:    String,
  pub summary_json:  String,
  pub created_at:    String,
}

impl RawParentReport {
  pub fn into_report(self) -> Result<ParentReport> {
    Ok(ParentReport {
      report_id:     decode_uuid(&self.report_id)?,
      connection_id: decode_uuid(&self.connection_id)?,
      period_start:  decode_date(&self.period_start)?,
      period_end:    decode_date(&self.period_end)?,
      summary:       decode_summary(&self.summary_json)?,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}
