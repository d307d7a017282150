//! LLM integration for the npc chat companion.
//!
//! The [`ChatModel`] trait abstracts over the upstream model provider; the
//! API layer holds a `dyn ChatModel` and never talks HTTP itself.
//! [`AnthropicClient`] is the production implementation, speaking the
//! Messages API over server-sent events.

mod client;
mod prompt;
mod stream;

pub mod error;

pub use client::{AnthropicClient, ChatModel, Turn};
pub use error::{Error, Result};
pub use prompt::system_prompt;
pub use stream::{ChannelStreamReceiver, StreamAccumulator, StreamChunk};
