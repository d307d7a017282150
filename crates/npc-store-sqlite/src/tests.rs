//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::NaiveDate;
use npc_core::{
  checkin::NewCheckin,
  goal::NewGoal,
  museum::NewMuseumItem,
  store::CompanionStore,
  user::{NewUser, UserUpdate},
  world::{NewWorld, NewWorldElement},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn new_user(name: &str) -> NewUser {
  NewUser {
    name:              name.into(),
    age:               Some(14),
    pronouns:          Some("they/them".into()),
    interests:         vec!["drawing".into(), "astronomy".into()],
    companion_name:    "Nova".into(),
    companion_persona: Some("curious and encouraging".into()),
  }
}

fn date(s: &str) -> NaiveDate { s.parse().unwrap() }

fn checkin(user_id: Uuid, on: &str, mood: &str) -> NewCheckin {
  NewCheckin {
    user_id,
    checked_on: date(on),
    mood: mood.into(),
    prompt: "How was your day?".into(),
    response: "pretty good".into(),
  }
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_user() {
  let s = store().await;

  let user = s.add_user(new_user("Riley")).await.unwrap();
  assert_eq!(user.name, "Riley");
  assert_eq!(user.companion_name, "Nova");

  let fetched = s.get_user(user.user_id).await.unwrap().unwrap();
  assert_eq!(fetched.user_id, user.user_id);
  assert_eq!(fetched.interests, vec!["drawing", "astronomy"]);
  assert_eq!(fetched.age, Some(14));
}

#[tokio::test]
async fn get_user_missing_returns_none() {
  let s = store().await;
  assert!(s.get_user(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn update_user_applies_only_provided_fields() {
  let s = store().await;
  let user = s.add_user(new_user("Riley")).await.unwrap();

  let updated = s
    .update_user(user.user_id, UserUpdate {
      companion_name: Some("Comet".into()),
      ..Default::default()
    })
    .await
    .unwrap()
    .unwrap();

  assert_eq!(updated.companion_name, "Comet");
  assert_eq!(updated.name, "Riley");
  assert_eq!(updated.age, Some(14));

  let fetched = s.get_user(user.user_id).await.unwrap().unwrap();
  assert_eq!(fetched.companion_name, "Comet");
}

#[tokio::test]
async fn update_missing_user_returns_none() {
  let s = store().await;
  let result = s
    .update_user(Uuid::new_v4(), UserUpdate {
      name: Some("Ghost".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert!(result.is_none());
}

#[tokio::test]
async fn delete_user_cascades_to_all_owned_rows() {
  let s = store().await;
  let user = s.add_user(new_user("Riley")).await.unwrap();
  let friend = s.add_user(new_user("Sam")).await.unwrap();

  // Seed one row of everything the user owns.
  let session = s.add_session(user.user_id, None).await.unwrap();
  s.add_message(session.session_id, npc_core::chat::MessageRole::User, "hi".into())
    .await
    .unwrap();
  s.upsert_checkin(checkin(user.user_id, "2026-03-01", "happy"))
    .await
    .unwrap();
  s.add_goal(NewGoal {
    user_id:     user.user_id,
    title:       "read more".into(),
    description: None,
  })
  .await
  .unwrap();
  s.add_museum_item(NewMuseumItem {
    user_id: user.user_id,
    title:   "First sketch".into(),
    insight: "I can actually draw".into(),
    wing:    "creativity".into(),
  })
  .await
  .unwrap();
  let world = s
    .add_world(NewWorld {
      owner_id:    user.user_id,
      name:        "Moonbase".into(),
      description: None,
      invite_code: "MOON42".into(),
    })
    .await
    .unwrap();
  s.join_world(world.world_id, friend.user_id).await.unwrap();
  s.grant_achievement(user.user_id, "first_chat".into()).await.unwrap();
  s.record_milestone(user.user_id, "First chat!".into()).await.unwrap();
  s.log_activity(user.user_id, "chat".into(), None).await.unwrap();
  s.bump_daily_activity(user.user_id, date("2026-03-01"))
    .await
    .unwrap();
  s.add_parent_connection(user.user_id, "parent@example.com".into(), "deadbeef".into())
    .await
    .unwrap();

  assert!(s.delete_user(user.user_id).await.unwrap());

  assert!(s.get_user(user.user_id).await.unwrap().is_none());
  assert!(s.get_session(session.session_id).await.unwrap().is_none());
  assert!(s.list_checkins(user.user_id).await.unwrap().is_empty());
  assert!(s.list_goals(user.user_id).await.unwrap().is_empty());
  assert!(s.list_museum_items(user.user_id, None).await.unwrap().is_empty());
  assert!(s.list_achievements(user.user_id).await.unwrap().is_empty());
  assert!(s.list_milestones(user.user_id).await.unwrap().is_empty());
  assert!(s.list_parent_connections(user.user_id).await.unwrap().is_empty());

  // The owned world is gone, taking the friend's membership with it.
  assert!(s.get_world(world.world_id).await.unwrap().is_none());
  assert!(s.list_worlds_for(friend.user_id).await.unwrap().is_empty());

  // The other user survives untouched.
  assert!(s.get_user(friend.user_id).await.unwrap().is_some());
}

#[tokio::test]
async fn delete_missing_user_returns_false() {
  let s = store().await;
  assert!(!s.delete_user(Uuid::new_v4()).await.unwrap());
}

// ─── Chat ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn transcript_preserves_order() {
  let s = store().await;
  let user = s.add_user(new_user("Riley")).await.unwrap();
  let session = s
    .add_session(user.user_id, Some("late night thoughts".into()))
    .await
    .unwrap();

  use npc_core::chat::MessageRole;
  s.add_message(session.session_id, MessageRole::User, "hey".into())
    .await
    .unwrap();
  s.add_message(session.session_id, MessageRole::Assistant, "hey! what's up?".into())
    .await
    .unwrap();
  s.add_message(session.session_id, MessageRole::User, "can't sleep".into())
    .await
    .unwrap();

  let transcript = s.list_messages(session.session_id).await.unwrap();
  assert_eq!(transcript.len(), 3);
  assert_eq!(transcript[0].content, "hey");
  assert_eq!(transcript[0].role, MessageRole::User);
  assert_eq!(transcript[1].role, MessageRole::Assistant);
  assert_eq!(transcript[2].content, "can't sleep");
}

#[tokio::test]
async fn list_sessions_scoped_to_user() {
  let s = store().await;
  let a = s.add_user(new_user("Riley")).await.unwrap();
  let b = s.add_user(new_user("Sam")).await.unwrap();

  s.add_session(a.user_id, None).await.unwrap();
  s.add_session(a.user_id, None).await.unwrap();
  s.add_session(b.user_id, None).await.unwrap();

  assert_eq!(s.list_sessions(a.user_id).await.unwrap().len(), 2);
  assert_eq!(s.list_sessions(b.user_id).await.unwrap().len(), 1);
}

// ─── Check-ins ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn same_day_checkin_replaces_previous() {
  let s = store().await;
  let user = s.add_user(new_user("Riley")).await.unwrap();

  s.upsert_checkin(checkin(user.user_id, "2026-03-01", "meh"))
    .await
    .unwrap();
  s.upsert_checkin(checkin(user.user_id, "2026-03-01", "happy"))
    .await
    .unwrap();

  let all = s.list_checkins(user.user_id).await.unwrap();
  assert_eq!(all.len(), 1);
  assert_eq!(all[0].mood, "happy");

  let day = s
    .get_checkin(user.user_id, date("2026-03-01"))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(day.mood, "happy");
}

#[tokio::test]
async fn checkin_dates_descending() {
  let s = store().await;
  let user = s.add_user(new_user("Riley")).await.unwrap();

  for d in ["2026-03-01", "2026-03-03", "2026-03-02"] {
    s.upsert_checkin(checkin(user.user_id, d, "fine")).await.unwrap();
  }

  let dates = s.checkin_dates(user.user_id).await.unwrap();
  assert_eq!(
    dates,
    vec![date("2026-03-03"), date("2026-03-02"), date("2026-03-01")]
  );
}

// ─── Goals ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn complete_goal_is_idempotent() {
  let s = store().await;
  let user = s.add_user(new_user("Riley")).await.unwrap();
  let goal = s
    .add_goal(NewGoal {
      user_id:     user.user_id,
      title:       "finish the comic".into(),
      description: Some("at least 5 pages".into()),
    })
    .await
    .unwrap();
  assert!(!goal.completed);

  let done = s.complete_goal(goal.goal_id).await.unwrap().unwrap();
  assert!(done.completed);
  let first_stamp = done.completed_at.unwrap();

  // Completing again keeps the original timestamp.
  let again = s.complete_goal(goal.goal_id).await.unwrap().unwrap();
  assert_eq!(again.completed_at.unwrap(), first_stamp);
}

#[tokio::test]
async fn complete_missing_goal_returns_none() {
  let s = store().await;
  assert!(s.complete_goal(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_goal_reports_existence() {
  let s = store().await;
  let user = s.add_user(new_user("Riley")).await.unwrap();
  let goal = s
    .add_goal(NewGoal {
      user_id:     user.user_id,
      title:       "x".into(),
      description: None,
    })
    .await
    .unwrap();

  assert!(s.delete_goal(goal.goal_id).await.unwrap());
  assert!(!s.delete_goal(goal.goal_id).await.unwrap());
}

// ─── Museum ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn museum_filter_by_wing() {
  let s = store().await;
  let user = s.add_user(new_user("Riley")).await.unwrap();

  for (title, wing) in [
    ("First sketch", "creativity"),
    ("Spoke up in class", "courage"),
    ("Finished a zine", "creativity"),
  ] {
    s.add_museum_item(NewMuseumItem {
      user_id: user.user_id,
      title:   title.into(),
      insight: "it mattered".into(),
      wing:    wing.into(),
    })
    .await
    .unwrap();
  }

  let all = s.list_museum_items(user.user_id, None).await.unwrap();
  assert_eq!(all.len(), 3);

  let creative = s
    .list_museum_items(user.user_id, Some("creativity".into()))
    .await
    .unwrap();
  assert_eq!(creative.len(), 2);
  assert!(creative.iter().all(|i| i.wing == "creativity"));
}

// ─── Worlds ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn world_owner_is_first_member() {
  let s = store().await;
  let owner = s.add_user(new_user("Riley")).await.unwrap();

  let world = s
    .add_world(NewWorld {
      owner_id:    owner.user_id,
      name:        "Moonbase".into(),
      description: Some("a city on the moon".into()),
      invite_code: "MOON42".into(),
    })
    .await
    .unwrap();

  assert!(s.is_world_member(world.world_id, owner.user_id).await.unwrap());

  let view = s.get_world(world.world_id).await.unwrap().unwrap();
  assert_eq!(view.member_count, 1);
  assert_eq!(view.world.invite_code, "MOON42");
}

#[tokio::test]
async fn join_world_via_invite_code() {
  let s = store().await;
  let owner = s.add_user(new_user("Riley")).await.unwrap();
  let friend = s.add_user(new_user("Sam")).await.unwrap();

  let world = s
    .add_world(NewWorld {
      owner_id:    owner.user_id,
      name:        "Moonbase".into(),
      description: None,
      invite_code: "MOON42".into(),
    })
    .await
    .unwrap();

  let found = s.find_world_by_invite("MOON42".into()).await.unwrap().unwrap();
  assert_eq!(found.world_id, world.world_id);
  assert!(s.find_world_by_invite("NOPE".into()).await.unwrap().is_none());

  assert!(s.join_world(world.world_id, friend.user_id).await.unwrap());
  // Joining twice is a no-op.
  assert!(!s.join_world(world.world_id, friend.user_id).await.unwrap());

  let view = s.get_world(world.world_id).await.unwrap().unwrap();
  assert_eq!(view.member_count, 2);

  let friends_worlds = s.list_worlds_for(friend.user_id).await.unwrap();
  assert_eq!(friends_worlds.len(), 1);
  assert_eq!(friends_worlds[0].world_id, world.world_id);
}

#[tokio::test]
async fn world_elements_in_creation_order() {
  let s = store().await;
  let owner = s.add_user(new_user("Riley")).await.unwrap();
  let world = s
    .add_world(NewWorld {
      owner_id:    owner.user_id,
      name:        "Moonbase".into(),
      description: None,
      invite_code: "MOON42".into(),
    })
    .await
    .unwrap();

  for (kind, name) in [("location", "The Dome"), ("character", "Captain Lune")] {
    s.add_world_element(NewWorldElement {
      world_id:    world.world_id,
      author_id:   owner.user_id,
      kind:        kind.into(),
      name:        name.into(),
      description: "...".into(),
    })
    .await
    .unwrap();
  }

  let elements = s.list_world_elements(world.world_id).await.unwrap();
  assert_eq!(elements.len(), 2);
  assert_eq!(elements[0].name, "The Dome");
  assert_eq!(elements[1].kind, "character");
}

// ─── Achievements & activity ─────────────────────────────────────────────────

#[tokio::test]
async fn achievement_granted_only_once() {
  let s = store().await;
  let user = s.add_user(new_user("Riley")).await.unwrap();

  let first = s.grant_achievement(user.user_id, "first_chat".into()).await.unwrap();
  assert!(first.is_some());

  let second = s.grant_achievement(user.user_id, "first_chat".into()).await.unwrap();
  assert!(second.is_none());

  let earned = s.list_achievements(user.user_id).await.unwrap();
  assert_eq!(earned.len(), 1);
  assert_eq!(earned[0].code, "first_chat");
}

#[tokio::test]
async fn bump_daily_activity_increments() {
  let s = store().await;
  let user = s.add_user(new_user("Riley")).await.unwrap();
  let day = date("2026-03-01");

  assert_eq!(s.bump_daily_activity(user.user_id, day).await.unwrap(), 1);
  assert_eq!(s.bump_daily_activity(user.user_id, day).await.unwrap(), 2);
  assert_eq!(
    s.bump_daily_activity(user.user_id, date("2026-03-02"))
      .await
      .unwrap(),
    1
  );
}

#[tokio::test]
async fn activity_counts_aggregate_everything() {
  let s = store().await;
  let user = s.add_user(new_user("Riley")).await.unwrap();

  use npc_core::chat::MessageRole;
  let session = s.add_session(user.user_id, None).await.unwrap();
  s.add_message(session.session_id, MessageRole::User, "hi".into())
    .await
    .unwrap();
  // Assistant replies don't count toward the user's chat total.
  s.add_message(session.session_id, MessageRole::Assistant, "hello!".into())
    .await
    .unwrap();

  s.upsert_checkin(checkin(user.user_id, "2026-03-01", "ok"))
    .await
    .unwrap();

  let goal = s
    .add_goal(NewGoal {
      user_id:     user.user_id,
      title:       "a".into(),
      description: None,
    })
    .await
    .unwrap();
  s.add_goal(NewGoal {
    user_id:     user.user_id,
    title:       "b".into(),
    description: None,
  })
  .await
  .unwrap();
  s.complete_goal(goal.goal_id).await.unwrap();

  s.add_world(NewWorld {
    owner_id:    user.user_id,
    name:        "W".into(),
    description: None,
    invite_code: "CODE01".into(),
  })
  .await
  .unwrap();

  let counts = s.activity_counts(user.user_id).await.unwrap();
  assert_eq!(counts.chat_messages, 1);
  assert_eq!(counts.checkins, 1);
  assert_eq!(counts.goals_created, 2);
  assert_eq!(counts.goals_completed, 1);
  assert_eq!(counts.worlds_joined, 1);
  assert_eq!(counts.museum_items, 0);
  assert_eq!(counts.world_elements, 0);
}

// ─── Parents ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn verify_parent_connection_by_token_hash() {
  let s = store().await;
  let user = s.add_user(new_user("Riley")).await.unwrap();

  let conn = s
    .add_parent_connection(user.user_id, "parent@example.com".into(), "abc123".into())
    .await
    .unwrap();
  assert!(!conn.verified);

  let verified = s.verify_parent_connection("abc123".into()).await.unwrap().unwrap();
  assert!(verified.verified);
  assert!(verified.verified_at.is_some());
  assert_eq!(verified.connection_id, conn.connection_id);

  assert!(s.verify_parent_connection("wrong".into()).await.unwrap().is_none());

  // Re-verifying keeps the original timestamp.
  let again = s.verify_parent_connection("abc123".into()).await.unwrap().unwrap();
  assert_eq!(again.verified_at, verified.verified_at);
}

#[tokio::test]
async fn report_summary_respects_window() {
  let s = store().await;
  let user = s.add_user(new_user("Riley")).await.unwrap();

  // Two check-ins inside the window, one before it.
  for d in ["2026-02-20", "2026-03-02", "2026-03-05"] {
    s.upsert_checkin(checkin(user.user_id, d, "ok")).await.unwrap();
  }

  use npc_core::chat::MessageRole;
  let session = s.add_session(user.user_id, None).await.unwrap();
  s.add_message(session.session_id, MessageRole::User, "hi".into())
    .await
    .unwrap();

  let goal = s
    .add_goal(NewGoal {
      user_id:     user.user_id,
      title:       "x".into(),
      description: None,
    })
    .await
    .unwrap();
  s.complete_goal(goal.goal_id).await.unwrap();
  s.grant_achievement(user.user_id, "first_checkin".into()).await.unwrap();

  // Messages, completions and grants above are stamped "now", outside an
  // all-past window; only the dated check-ins land inside it.
  let past = s
    .report_summary(user.user_id, date("2026-03-01"), date("2026-03-07"))
    .await
    .unwrap();
  assert_eq!(past.checkins, 2);
  assert_eq!(past.chat_messages, 0);

  // A window around today picks up the rest.
  let today = chrono::Utc::now().date_naive();
  let current = s.report_summary(user.user_id, today, today).await.unwrap();
  assert_eq!(current.chat_messages, 1);
  assert_eq!(current.goals_completed, 1);
  assert_eq!(current.achievements, 1);
}

#[tokio::test]
async fn parent_reports_roundtrip() {
  let s = store().await;
  let user = s.add_user(new_user("Riley")).await.unwrap();
  let conn = s
    .add_parent_connection(user.user_id, "parent@example.com".into(), "abc123".into())
    .await
    .unwrap();

  let summary = s
    .report_summary(user.user_id, date("2026-03-01"), date("2026-03-07"))
    .await
    .unwrap();
  let report = s
    .add_parent_report(
      conn.connection_id,
      date("2026-03-01"),
      date("2026-03-07"),
      summary,
    )
    .await
    .unwrap();

  let reports = s.list_parent_reports(conn.connection_id).await.unwrap();
  assert_eq!(reports.len(), 1);
  assert_eq!(reports[0].report_id, report.report_id);
  assert_eq!(reports[0].period_start, date("2026-03-01"));
  assert_eq!(reports[0].period_end, date("2026-03-07"));
}
