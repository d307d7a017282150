//! Daily check-ins and streak computation.
//!
//! A check-in is one journaling prompt/response per user per calendar day;
//! the store enforces uniqueness and writing twice on the same day replaces
//! the earlier entry. The streak is derived, never stored.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A recorded daily check-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkin {
  pub checkin_id: Uuid,
  pub user_id:    Uuid,
  /// The calendar day this check-in belongs to.
  pub checked_on: NaiveDate,
  /// Self-reported mood, e.g. "great", "okay", "rough".
  pub mood:       String,
  /// The journaling prompt shown to the user.
  pub prompt:     String,
  /// The user's free-text response.
  pub response:   String,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::CompanionStore::upsert_checkin`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewCheckin {
  pub user_id:    Uuid,
  pub checked_on: NaiveDate,
  pub mood:       String,
  pub prompt:     String,
  pub response:   String,
}

/// Length of the consecutive-day run ending at `today`.
///
/// `days` must be sorted descending with no duplicates (the store query
/// guarantees both). A missing entry for `today` is forgiven — a user who has
/// not checked in yet today still sees yesterday's streak — but a gap before
/// yesterday breaks the run.
pub fn streak_length(today: NaiveDate, days: &[NaiveDate]) -> u32 {
  let mut expected = match days.first() {
    Some(&d) if d == today => today,
    Some(&d) if d == today.pred_opt().unwrap_or(today) => d,
    _ => return 0,
  };

  let mut streak = 0;
  for &day in days {
    if day != expected {
      break;
    }
    streak += 1;
    expected = match expected.pred_opt() {
      Some(p) => p,
      None => break,
    };
  }
  streak
}

#[cfg(test)]
mod tests {
  use super::*;

  fn d(s: &str) -> NaiveDate { s.parse().unwrap() }

  #[test]
  fn empty_history_is_zero() {
    assert_eq!(streak_length(d("2026-03-10"), &[]), 0);
  }

  #[test]
  fn single_checkin_today() {
    assert_eq!(streak_length(d("2026-03-10"), &[d("2026-03-10")]), 1);
  }

  #[test]
  fn run_ending_today() {
    let days = [d("2026-03-10"), d("2026-03-09"), d("2026-03-08")];
    assert_eq!(streak_length(d("2026-03-10"), &days), 3);
  }

  #[test]
  fn today_missing_still_counts_through_yesterday() {
    let days = [d("2026-03-09"), d("2026-03-08")];
    assert_eq!(streak_length(d("2026-03-10"), &days), 2);
  }

  #[test]
  fn gap_breaks_the_run() {
    let days = [d("2026-03-10"), d("2026-03-08"), d("2026-03-07")];
    assert_eq!(streak_length(d("2026-03-10"), &days), 1);
  }

  #[test]
  fn stale_history_is_zero() {
    let days = [d("2026-03-01"), d("2026-02-28")];
    assert_eq!(streak_length(d("2026-03-10"), &days), 0);
  }
}
