//! The [`ChatModel`] trait and the production Messages-API client.

use async_trait::async_trait;
use futures::StreamExt as _;
use npc_core::chat::{ChatMessage, MessageRole};
use serde::Serialize;
use serde_json::{json, Value};

use crate::{
  stream::{ChannelStreamReceiver, StreamChunk},
  Error, Result,
};

/// One conversation turn as sent to the model.
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
  pub role:    &'static str,
  pub content: String,
}

impl From<&ChatMessage> for Turn {
  fn from(msg: &ChatMessage) -> Self {
    Self {
      role:    match msg.role {
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
      },
      content: msg.content.clone(),
    }
  }
}

/// Abstraction over the upstream chat model.
#[async_trait]
pub trait ChatModel: Send + Sync {
  /// Start a streaming completion. Chunks arrive on the returned receiver;
  /// the stream always terminates with a `Done` or `Error` chunk.
  async fn stream_chat(
    &self,
    system: String,
    turns: Vec<Turn>,
  ) -> Result<ChannelStreamReceiver>;
}

/// Client for an Anthropic-compatible Messages API.
#[derive(Clone)]
pub struct AnthropicClient {
  http:       reqwest::Client,
  api_base:   String,
  api_key:    String,
  model:      String,
  max_tokens: u32,
}

const API_VERSION: &str = "2023-06-01";

impl AnthropicClient {
  pub fn new(
    api_base: impl Into<String>,
    api_key: impl Into<String>,
    model: impl Into<String>,
    max_tokens: u32,
  ) -> Self {
    Self {
      http: reqwest::Client::new(),
      api_base: api_base.into(),
      api_key: api_key.into(),
      model: model.into(),
      max_tokens,
    }
  }

  fn request_body(&self, system: &str, turns: &[Turn]) -> Value {
    json!({
      "model": self.model,
      "max_tokens": self.max_tokens,
      "stream": true,
      "system": system,
      "messages": turns,
    })
  }
}

#[async_trait]
impl ChatModel for AnthropicClient {
  async fn stream_chat(
    &self,
    system: String,
    turns: Vec<Turn>,
  ) -> Result<ChannelStreamReceiver> {
    let response = self
      .http
      .post(format!("{}/v1/messages", self.api_base))
      .header("x-api-key", &self.api_key)
      .header("anthropic-version", API_VERSION)
      .json(&self.request_body(&system, &turns))
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      let message = response.text().await.unwrap_or_default();
      return Err(Error::Api { status: status.as_u16(), message });
    }

    let (tx, rx) = ChannelStreamReceiver::pair(64);

    tokio::spawn(async move {
      let mut body = response.bytes_stream();
      let mut buf = String::new();
      let mut content = String::new();

      while let Some(frame) = body.next().await {
        let bytes = match frame {
          Ok(b) => b,
          Err(e) => {
            tracing::warn!(error = %e, "model stream broke mid-response");
            let _ = tx.send(StreamChunk::Error { message: e.to_string() }).await;
            return;
          }
        };
        buf.push_str(&String::from_utf8_lossy(&bytes));

        // SSE events are separated by a blank line.
        while let Some(pos) = buf.find("\n\n") {
          let event: String = buf.drain(..pos + 2).collect();
          for line in event.lines() {
            let Some(data) = line.strip_prefix("data:") else { continue };
            match parse_event(data.trim()) {
              Some(SseEvent::Delta(text)) => {
                content.push_str(&text);
                let _ = tx.send(StreamChunk::TextDelta { text }).await;
              }
              Some(SseEvent::Stop) => {
                let _ = tx.send(StreamChunk::Done { content }).await;
                return;
              }
              Some(SseEvent::Failed(message)) => {
                let _ = tx.send(StreamChunk::Error { message }).await;
                return;
              }
              None => {}
            }
          }
        }
      }

      // Connection closed without an explicit stop; flush what we have.
      let _ = tx.send(StreamChunk::Done { content }).await;
    });

    Ok(rx)
  }
}

enum SseEvent {
  Delta(String),
  Stop,
  Failed(String),
}

/// Decode one SSE `data:` payload from the Messages API.
fn parse_event(data: &str) -> Option<SseEvent> {
  let value: Value = serde_json::from_str(data).ok()?;
  match value.get("type").and_then(Value::as_str)? {
    "content_block_delta" => {
      let delta = value.get("delta")?;
      if delta.get("type").and_then(Value::as_str) == Some("text_delta") {
        let text = delta.get("text").and_then(Value::as_str)?;
        Some(SseEvent::Delta(text.to_owned()))
      } else {
        None
      }
    }
    "message_stop" => Some(SseEvent::Stop),
    "error" => {
      let message = value
        .pointer("/error/message")
        .and_then(Value::as_str)
        .unwrap_or("unknown model error");
      Some(SseEvent::Failed(message.to_owned()))
    }
    // ping, message_start, content_block_start/stop, message_delta
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_text_delta() {
    let data = r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hi!"}}"#;
    assert!(matches!(parse_event(data), Some(SseEvent::Delta(t)) if t == "Hi!"));
  }

  #[test]
  fn parse_message_stop() {
    assert!(matches!(
      parse_event(r#"{"type":"message_stop"}"#),
      Some(SseEvent::Stop)
    ));
  }

  #[test]
  fn parse_error_event() {
    let data = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
    assert!(
      matches!(parse_event(data), Some(SseEvent::Failed(m)) if m == "Overloaded")
    );
  }

  #[test]
  fn ignores_housekeeping_events() {
    assert!(parse_event(r#"{"type":"ping"}"#).is_none());
    assert!(parse_event(r#"{"type":"message_start","message":{}}"#).is_none());
    assert!(parse_event("not json").is_none());
  }

  #[test]
  fn request_body_shape() {
    let client = AnthropicClient::new("https://api.example.com", "k", "model-x", 512);
    let body = client.request_body("be nice", &[Turn {
      role:    "user",
      content: "hello".into(),
    }]);

    assert_eq!(body["model"], "model-x");
    assert_eq!(body["max_tokens"], 512);
    assert_eq!(body["stream"], true);
    assert_eq!(body["system"], "be nice");
    assert_eq!(body["messages"][0]["role"], "user");
    assert_eq!(body["messages"][0]["content"], "hello");
  }
}
