//! Parent connections and weekly reports.
//!
//! A parent links to a teen's account through an emailed magic link. The
//! store never sees the raw token — only its SHA-256 digest, computed by the
//! API layer. Reports are point-in-time aggregates, stored as JSON.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A link between a teen account and a parent email address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentConnection {
  pub connection_id: Uuid,
  pub user_id:       Uuid,
  pub parent_email:  String,
  /// Hex SHA-256 of the magic-link token. Never serialised to clients.
  #[serde(skip_serializing)]
  pub token_hash:    String,
  pub verified:      bool,
  pub created_at:    DateTime<Utc>,
  pub verified_at:   Option<DateTime<Utc>>,
}

/// Activity totals over a report period.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ReportSummary {
  pub checkins:        u32,
  pub chat_messages:   u32,
  pub goals_completed: u32,
  pub achievements:    u32,
}

/// A stored weekly report for a verified connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentReport {
  pub report_id:     Uuid,
  pub connection_id: Uuid,
  pub period_start:  NaiveDate,
  pub period_end:    NaiveDate,
  pub summary:       ReportSummary,
  pub created_at:    DateTime<Utc>,
}
