//! Chat sessions and messages.
//!
//! A session is a thin envelope; the transcript lives in `chat_messages`,
//! ordered by `created_at`. Assistant rows are written by the streaming
//! relay after the provider stream completes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
  User,
  Assistant,
}

/// A chat conversation belonging to one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
  pub session_id: Uuid,
  pub user_id:    Uuid,
  pub title:      Option<String>,
  pub created_at: DateTime<Utc>,
}

/// One turn in a session's transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
  pub message_id: Uuid,
  pub session_id: Uuid,
  pub role:       MessageRole,
  pub content:    String,
  pub created_at: DateTime<Utc>,
}
