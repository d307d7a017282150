//! Achievements, milestones, and the threshold evaluator.
//!
//! The evaluator is a pure comparison of activity counts against a fixed
//! catalogue. Idempotency of grants is the store's job (a UNIQUE constraint
//! on `(user_id, code)`); this module only decides what is currently earned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Records ─────────────────────────────────────────────────────────────────

/// An achievement a user has earned. At most one row per `(user_id, code)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Achievement {
  pub achievement_id: Uuid,
  pub user_id:        Uuid,
  pub code:           String,
  pub earned_at:      DateTime<Utc>,
}

/// A timeline entry written alongside each fresh achievement grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
  pub milestone_id: Uuid,
  pub user_id:      Uuid,
  pub label:        String,
  pub achieved_at:  DateTime<Utc>,
}

/// A free-form activity log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
  pub entry_id:   Uuid,
  pub user_id:    Uuid,
  /// What happened, e.g. "chat", "checkin", "goal_completed".
  pub kind:       String,
  pub detail:     Option<String>,
  pub created_at: DateTime<Utc>,
}

// ─── Counts snapshot ─────────────────────────────────────────────────────────

/// Aggregate counts the evaluator compares against thresholds.
/// Produced by one store query; all counts are lifetime totals.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ActivityCounts {
  pub chat_messages:  u32,
  pub checkins:       u32,
  pub museum_items:   u32,
  pub goals_created:  u32,
  pub goals_completed: u32,
  pub worlds_joined:  u32,
  pub world_elements: u32,
}

// ─── Catalogue ───────────────────────────────────────────────────────────────

/// Which counter a rule reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
  ChatMessages,
  Checkins,
  MuseumItems,
  GoalsCreated,
  GoalsCompleted,
  WorldsJoined,
  WorldElements,
}

impl Metric {
  fn read(self, counts: &ActivityCounts) -> u32 {
    match self {
      Self::ChatMessages => counts.chat_messages,
      Self::Checkins => counts.checkins,
      Self::MuseumItems => counts.museum_items,
      Self::GoalsCreated => counts.goals_created,
      Self::GoalsCompleted => counts.goals_completed,
      Self::WorldsJoined => counts.worlds_joined,
      Self::WorldElements => counts.world_elements,
    }
  }
}

/// One catalogue entry: earn `code` once `metric` reaches `threshold`.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
  pub code:      &'static str,
  pub label:     &'static str,
  pub metric:    Metric,
  pub threshold: u32,
}

/// The fixed achievement catalogue.
pub const CATALOGUE: &[Rule] = &[
  Rule { code: "first_chat",       label: "Said hello to your companion",  metric: Metric::ChatMessages,   threshold: 1 },
  Rule { code: "deep_talker",      label: "30 messages deep",              metric: Metric::ChatMessages,   threshold: 30 },
  Rule { code: "first_checkin",    label: "First daily check-in",          metric: Metric::Checkins,       threshold: 1 },
  Rule { code: "week_of_checkins", label: "Seven check-ins",               metric: Metric::Checkins,       threshold: 7 },
  Rule { code: "reflective_month", label: "Thirty check-ins",              metric: Metric::Checkins,       threshold: 30 },
  Rule { code: "first_exhibit",    label: "First museum exhibit",          metric: Metric::MuseumItems,    threshold: 1 },
  Rule { code: "curator",          label: "Ten exhibits curated",          metric: Metric::MuseumItems,    threshold: 10 },
  Rule { code: "goal_setter",      label: "Set your first goal",           metric: Metric::GoalsCreated,   threshold: 1 },
  Rule { code: "goal_getter",      label: "Five goals completed",          metric: Metric::GoalsCompleted, threshold: 5 },
  Rule { code: "world_builder",    label: "Joined your first world",       metric: Metric::WorldsJoined,   threshold: 1 },
  Rule { code: "architect",        label: "Ten world elements authored",   metric: Metric::WorldElements,  threshold: 10 },
];

/// All catalogue rules whose threshold `counts` meets or exceeds.
///
/// Returns every earned rule, not just newly earned ones — the store's
/// idempotent insert decides which grants are actually fresh.
pub fn earned_rules(counts: &ActivityCounts) -> Vec<&'static Rule> {
  CATALOGUE
    .iter()
    .filter(|rule| rule.metric.read(counts) >= rule.threshold)
    .collect()
}

/// Look up a rule by code.
pub fn rule_by_code(code: &str) -> Option<&'static Rule> {
  CATALOGUE.iter().find(|rule| rule.code == code)
}
