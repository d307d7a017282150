//! Plain-text email templates.

use chrono::NaiveDate;
use npc_core::parent::ReportSummary;

use crate::Email;

/// The magic-link email sent when a teen connects a parent.
pub fn magic_link(to: &str, teen_name: &str, verify_url: &str) -> Email {
  Email {
    to: to.to_owned(),
    subject: format!("{teen_name} wants to connect with you"),
    body: format!(
      "Hi,\n\n\
       {teen_name} has invited you to connect as a parent on npc. Connecting \
       lets you receive a short weekly summary of how they're doing — you \
       will never see their conversations or journal entries.\n\n\
       Click the link below to confirm:\n\n\
       {verify_url}\n\n\
       If you weren't expecting this, you can safely ignore this email.\n"
    ),
  }
}

/// The weekly activity report sent to a verified parent.
pub fn weekly_report(
  to: &str,
  teen_name: &str,
  start: NaiveDate,
  end: NaiveDate,
  summary: &ReportSummary,
) -> Email {
  Email {
    to: to.to_owned(),
    subject: format!("{teen_name}'s week on npc"),
    body: format!(
      "Hi,\n\n\
       Here's how {teen_name}'s week went ({start} to {end}):\n\n\
       - Daily check-ins: {}\n\
       - Chat messages sent: {}\n\
       - Goals completed: {}\n\
       - Achievements earned: {}\n\n\
       These are activity counts only. Conversations and journal entries \
       stay private.\n",
      summary.checkins,
      summary.chat_messages,
      summary.goals_completed,
      summary.achievements,
    ),
  }
}

#[cfg(test)]
mod tests {
  use npc_core::parent::ReportSummary;

  use super::*;

  #[test]
  fn magic_link_includes_url_and_name() {
    let email = magic_link(
      "parent@example.com",
      "Riley",
      "https://npc.example.com/parents/verify?token=abc",
    );
    assert_eq!(email.to, "parent@example.com");
    assert!(email.subject.contains("Riley"));
    assert!(email.body.contains("https://npc.example.com/parents/verify?token=abc"));
    assert!(email.body.contains("never see their conversations"));
  }

  #[test]
  fn weekly_report_lists_counts() {
    let summary = ReportSummary {
      checkins:        5,
      chat_messages:   42,
      goals_completed: 2,
      achievements:    1,
    };
    let email = weekly_report(
      "parent@example.com",
      "Riley",
      "2026-03-01".parse().unwrap(),
      "2026-03-07".parse().unwrap(),
      &summary,
    );
    assert!(email.subject.contains("Riley"));
    assert!(email.body.contains("2026-03-01 to 2026-03-07"));
    assert!(email.body.contains("Daily check-ins: 5"));
    assert!(email.body.contains("Chat messages sent: 42"));
    assert!(email.body.contains("Goals completed: 2"));
    assert!(email.body.contains("Achievements earned: 1"));
  }
}
