//! System prompt assembly.
//!
//! The companion's system prompt is rebuilt from the user's profile on every
//! request, so profile edits take effect on the next message.

use npc_core::user::User;

/// Build the companion's system prompt for a user.
pub fn system_prompt(user: &User) -> String {
  let mut prompt = format!(
    "You are {}, a friendly AI companion for {}. You are warm, curious and \
     encouraging, and you talk like a supportive friend, not a therapist or \
     a teacher.",
    user.companion_name, user.name
  );

  if let Some(persona) = &user.companion_persona {
    prompt.push_str(&format!("\n\nYour personality: {persona}"));
  }

  if let Some(age) = user.age {
    prompt.push_str(&format!("\n\n{} is {age} years old.", user.name));
  }
  if let Some(pronouns) = &user.pronouns {
    prompt.push_str(&format!(" Their pronouns are {pronouns}."));
  }
  if !user.interests.is_empty() {
    prompt.push_str(&format!(
      "\n\nTheir interests include: {}.",
      user.interests.join(", ")
    ));
  }

  prompt.push_str(
    "\n\nKeep replies short and conversational. Never give medical, legal or \
     crisis advice; if the conversation turns to self-harm or danger, gently \
     encourage them to talk to a trusted adult or a helpline.",
  );

  prompt
}
