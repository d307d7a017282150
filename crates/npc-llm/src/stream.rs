//! Streaming response plumbing.
//!
//! Providers push [`StreamChunk`]s into a bounded channel from a background
//! task; the relay endpoint drains the channel and forwards deltas to the
//! browser while accumulating the full reply for persistence.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// A single chunk from a streaming model response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamChunk {
  /// A partial text fragment.
  TextDelta { text: String },
  /// The stream finished; carries the full assembled reply.
  Done { content: String },
  /// The stream failed mid-flight.
  Error { message: String },
}

/// Receiving half of a model stream, backed by a tokio mpsc channel.
pub struct ChannelStreamReceiver {
  rx: mpsc::Receiver<StreamChunk>,
}

impl ChannelStreamReceiver {
  /// A matched sender/receiver pair with the given buffer size.
  pub fn pair(buffer: usize) -> (mpsc::Sender<StreamChunk>, Self) {
    let (tx, rx) = mpsc::channel(buffer);
    (tx, Self { rx })
  }

  /// The next chunk, or `None` once the sender is dropped.
  pub async fn next(&mut self) -> Option<StreamChunk> { self.rx.recv().await }
}

/// Assembles a complete reply out of streamed chunks.
#[derive(Default)]
pub struct StreamAccumulator {
  text: String,
  failed: bool,
}

impl StreamAccumulator {
  pub fn new() -> Self { Self::default() }

  /// Fold in a chunk; returns `true` once the stream is finished.
  pub fn push(&mut self, chunk: &StreamChunk) -> bool {
    match chunk {
      StreamChunk::TextDelta { text } => {
        self.text.push_str(text);
        false
      }
      StreamChunk::Done { content } => {
        // The Done chunk carries the authoritative assembled content.
        self.text = content.clone();
        true
      }
      StreamChunk::Error { .. } => {
        self.failed = true;
        true
      }
    }
  }

  pub fn text(&self) -> &str { &self.text }

  /// `true` if the stream ended with an [`StreamChunk::Error`].
  pub fn failed(&self) -> bool { self.failed }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn chunk_serde_roundtrip() {
    let delta = StreamChunk::TextDelta { text: "hello ".into() };
    let json = serde_json::to_string(&delta).unwrap();
    assert!(json.contains("text_delta"));

    let back: StreamChunk = serde_json::from_str(&json).unwrap();
    match back {
      StreamChunk::TextDelta { text } => assert_eq!(text, "hello "),
      _ => panic!("wrong variant"),
    }
  }

  #[test]
  fn accumulator_assembles_deltas() {
    let mut acc = StreamAccumulator::new();

    assert!(!acc.push(&StreamChunk::TextDelta { text: "Hello ".into() }));
    assert!(!acc.push(&StreamChunk::TextDelta { text: "world!".into() }));
    assert_eq!(acc.text(), "Hello world!");

    let done = acc.push(&StreamChunk::Done { content: "Hello world!".into() });
    assert!(done);
    assert_eq!(acc.text(), "Hello world!");
    assert!(!acc.failed());
  }

  #[test]
  fn accumulator_error_terminates() {
    let mut acc = StreamAccumulator::new();
    acc.push(&StreamChunk::TextDelta { text: "partial".into() });
    assert!(acc.push(&StreamChunk::Error { message: "timeout".into() }));
    assert!(acc.failed());
    // Partial text survives so the relay can persist what arrived.
    assert_eq!(acc.text(), "partial");
  }

  #[tokio::test]
  async fn channel_receiver_drains_then_closes() {
    let (tx, mut rx) = ChannelStreamReceiver::pair(16);

    tx.send(StreamChunk::TextDelta { text: "hi".into() }).await.unwrap();
    tx.send(StreamChunk::Done { content: "hi".into() }).await.unwrap();
    drop(tx);

    assert!(matches!(rx.next().await, Some(StreamChunk::TextDelta { .. })));
    assert!(matches!(rx.next().await, Some(StreamChunk::Done { .. })));
    assert!(rx.next().await.is_none());
  }
}
