//! The `CompanionStore` trait.
//!
//! Implemented by storage backends (e.g. `npc-store-sqlite`). The API layer
//! depends on this abstraction, not on any concrete backend.
//!
//! All methods return `Send` futures so the trait can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`). Server-assigned
//! fields (ids, timestamps) are always set by the store; callers never supply
//! them.

use std::future::Future;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  achievement::{Achievement, ActivityCounts, ActivityEntry, Milestone},
  chat::{ChatMessage, ChatSession, MessageRole},
  checkin::{Checkin, NewCheckin},
  goal::{Goal, NewGoal},
  museum::{MuseumItem, NewMuseumItem},
  parent::{ParentConnection, ParentReport, ReportSummary},
  user::{NewUser, User, UserUpdate},
  world::{NewWorld, NewWorldElement, World, WorldElement, WorldView},
};

/// Abstraction over the npc storage backend.
pub trait CompanionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Create and persist a new user profile.
  fn add_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Retrieve a user by UUID. Returns `None` if not found.
  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Apply a partial profile update. Returns the updated row, or `None` if
  /// the user does not exist.
  fn update_user(
    &self,
    id: Uuid,
    update: UserUpdate,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Delete a user and every row that references them, in FK dependency
  /// order, atomically. Returns `false` if the user did not exist.
  fn delete_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Chat ──────────────────────────────────────────────────────────────

  /// Create a chat session for a user.
  fn add_session(
    &self,
    user_id: Uuid,
    title: Option<String>,
  ) -> impl Future<Output = Result<ChatSession, Self::Error>> + Send + '_;

  /// Retrieve a session by UUID.
  fn get_session(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<ChatSession>, Self::Error>> + Send + '_;

  /// List a user's sessions, newest first.
  fn list_sessions(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ChatSession>, Self::Error>> + Send + '_;

  /// Append a message to a session's transcript.
  fn add_message(
    &self,
    session_id: Uuid,
    role: MessageRole,
    content: String,
  ) -> impl Future<Output = Result<ChatMessage, Self::Error>> + Send + '_;

  /// A session's full transcript, oldest first.
  fn list_messages(
    &self,
    session_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ChatMessage>, Self::Error>> + Send + '_;

  // ── Check-ins ─────────────────────────────────────────────────────────

  /// Insert or replace the check-in for `(user_id, checked_on)`.
  fn upsert_checkin(
    &self,
    input: NewCheckin,
  ) -> impl Future<Output = Result<Checkin, Self::Error>> + Send + '_;

  /// The check-in for a specific day, if any.
  fn get_checkin(
    &self,
    user_id: Uuid,
    on: NaiveDate,
  ) -> impl Future<Output = Result<Option<Checkin>, Self::Error>> + Send + '_;

  /// All of a user's check-ins, newest first.
  fn list_checkins(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Checkin>, Self::Error>> + Send + '_;

  /// Distinct check-in dates for a user, descending. Input to the streak
  /// computation in [`crate::checkin::streak_length`].
  fn checkin_dates(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<NaiveDate>, Self::Error>> + Send + '_;

  // ── Goals ─────────────────────────────────────────────────────────────

  fn add_goal(
    &self,
    input: NewGoal,
  ) -> impl Future<Output = Result<Goal, Self::Error>> + Send + '_;

  fn list_goals(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Goal>, Self::Error>> + Send + '_;

  /// Mark a goal completed and stamp `completed_at`. Idempotent; returns the
  /// updated row, or `None` if the goal does not exist.
  fn complete_goal(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Goal>, Self::Error>> + Send + '_;

  /// Returns `false` if the goal did not exist.
  fn delete_goal(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Museum ────────────────────────────────────────────────────────────

  fn add_museum_item(
    &self,
    input: NewMuseumItem,
  ) -> impl Future<Output = Result<MuseumItem, Self::Error>> + Send + '_;

  /// List a user's collection, optionally restricted to one wing.
  fn list_museum_items(
    &self,
    user_id: Uuid,
    wing: Option<String>,
  ) -> impl Future<Output = Result<Vec<MuseumItem>, Self::Error>> + Send + '_;

  fn delete_museum_item(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Worlds ────────────────────────────────────────────────────────────

  /// Create a world and enrol the owner as its first member.
  fn add_world(
    &self,
    input: NewWorld,
  ) -> impl Future<Output = Result<World, Self::Error>> + Send + '_;

  /// Look up a world by its invite code.
  fn find_world_by_invite(
    &self,
    invite_code: String,
  ) -> impl Future<Output = Result<Option<World>, Self::Error>> + Send + '_;

  /// A world plus its member count.
  fn get_world(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<WorldView>, Self::Error>> + Send + '_;

  /// Worlds the user is a member of, newest first.
  fn list_worlds_for(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<World>, Self::Error>> + Send + '_;

  /// Enrol a user in a world. Returns `true` if the membership is new,
  /// `false` if they were already a member.
  fn join_world(
    &self,
    world_id: Uuid,
    user_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn is_world_member(
    &self,
    world_id: Uuid,
    user_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn add_world_element(
    &self,
    input: NewWorldElement,
  ) -> impl Future<Output = Result<WorldElement, Self::Error>> + Send + '_;

  /// A world's elements, oldest first.
  fn list_world_elements(
    &self,
    world_id: Uuid,
  ) -> impl Future<Output = Result<Vec<WorldElement>, Self::Error>> + Send + '_;

  // ── Achievements & activity ───────────────────────────────────────────

  /// Grant an achievement if not already held. Returns the new row, or
  /// `None` if the user already had it (the grant is idempotent).
  fn grant_achievement(
    &self,
    user_id: Uuid,
    code: String,
  ) -> impl Future<Output = Result<Option<Achievement>, Self::Error>> + Send + '_;

  fn list_achievements(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Achievement>, Self::Error>> + Send + '_;

  fn record_milestone(
    &self,
    user_id: Uuid,
    label: String,
  ) -> impl Future<Output = Result<Milestone, Self::Error>> + Send + '_;

  fn list_milestones(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Milestone>, Self::Error>> + Send + '_;

  /// Append an activity-log row.
  fn log_activity(
    &self,
    user_id: Uuid,
    kind: String,
    detail: Option<String>,
  ) -> impl Future<Output = Result<ActivityEntry, Self::Error>> + Send + '_;

  /// Increment the per-day activity counter and return the new count.
  fn bump_daily_activity(
    &self,
    user_id: Uuid,
    day: NaiveDate,
  ) -> impl Future<Output = Result<u32, Self::Error>> + Send + '_;

  /// Lifetime aggregate counts, the evaluator's input.
  fn activity_counts(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<ActivityCounts, Self::Error>> + Send + '_;

  // ── Parents ───────────────────────────────────────────────────────────

  /// Create a parent connection. The token digest is computed by the caller.
  fn add_parent_connection(
    &self,
    user_id: Uuid,
    parent_email: String,
    token_hash: String,
  ) -> impl Future<Output = Result<ParentConnection, Self::Error>> + Send + '_;

  /// Mark the connection holding `token_hash` verified. Returns the updated
  /// connection, or `None` if no connection matches.
  fn verify_parent_connection(
    &self,
    token_hash: String,
  ) -> impl Future<Output = Result<Option<ParentConnection>, Self::Error>> + Send + '_;

  fn get_parent_connection(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<ParentConnection>, Self::Error>> + Send + '_;

  fn list_parent_connections(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ParentConnection>, Self::Error>> + Send + '_;

  /// Aggregate a user's activity between `start` and `end` (inclusive
  /// calendar days) for a parent report.
  fn report_summary(
    &self,
    user_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
  ) -> impl Future<Output = Result<ReportSummary, Self::Error>> + Send + '_;

  fn add_parent_report(
    &self,
    connection_id: Uuid,
    period_start: NaiveDate,
    period_end: NaiveDate,
    summary: ReportSummary,
  ) -> impl Future<Output = Result<ParentReport, Self::Error>> + Send + '_;

  /// Past reports for a connection, newest first.
  fn list_parent_reports(
    &self,
    connection_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ParentReport>, Self::Error>> + Send + '_;
}
