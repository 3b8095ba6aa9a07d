//! Backend chunk stream → token-stream events.
//!
//! A [`StreamTranslator`] owns the per-request state: the text generated so far and the number
//! of chunks seen. It is fed one chunk at a time and answers with at most one
//! [`OutputEvent`]. [`translate`] drives it over a whole [`ChunkStream`].
//!
//! Chunks are JSON objects carrying a `completion` text delta and a `stop_reason`. Both keys
//! must be present (either may be `null`). A chunk that does not have this shape still counts
//! towards the chunk total but contributes no text.

use futures::{Stream, StreamExt};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    backend::{BackendChunk, ChunkStream},
    error::AdapterError,
    model::{Details, OutputEvent, Token},
};

/// Fields pulled out of a well-formed chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFields {
    pub content: Option<String>,
    pub stop_reason: Option<String>,
}

impl ChunkFields {
    /// Returns `None` when the chunk is malformed.
    pub fn parse(chunk: &BackendChunk) -> Option<Self> {
        let value: Value = serde_json::from_slice(chunk.payload()).ok()?;
        let object = value.as_object()?;
        Some(Self {
            content: nullable_string(object.get("completion")?)?,
            stop_reason: nullable_string(object.get("stop_reason")?)?,
        })
    }

    /// Some backends spell an absent stop reason as the text `"null"`.
    pub fn is_terminal(&self) -> bool {
        self.stop_reason
            .as_deref()
            .is_some_and(|reason| reason != "null")
    }
}

fn nullable_string(value: &Value) -> Option<Option<String>> {
    match value {
        Value::Null => Some(None),
        Value::String(s) => Some(Some(s.clone())),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslatorState {
    Streaming,
    Terminated,
}

#[derive(Debug)]
pub struct StreamTranslator {
    state: TranslatorState,
    cumulative_text: String,
    token_count: u32,
}

impl Default for StreamTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamTranslator {
    pub fn new() -> Self {
        Self {
            state: TranslatorState::Streaming,
            cumulative_text: String::new(),
            token_count: 0,
        }
    }

    pub fn state(&self) -> TranslatorState {
        self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state == TranslatorState::Terminated
    }

    pub fn cumulative_text(&self) -> &str {
        &self.cumulative_text
    }

    pub fn token_count(&self) -> u32 {
        self.token_count
    }

    /// Consumes one chunk. Chunks arriving after termination are ignored.
    pub fn accept(&mut self, chunk: BackendChunk) -> Option<OutputEvent> {
        if self.is_terminated() {
            return None;
        }

        self.token_count += 1;

        let fields = match ChunkFields::parse(&chunk) {
            Some(fields) => fields,
            None => {
                warn!(
                    chunk = self.token_count,
                    "backend chunk has no completion/stop_reason pair, skipping its content"
                );
                return None;
            }
        };
        debug!(chunk = self.token_count, ?fields, "backend chunk");

        let text = match fields.content.as_deref() {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => return None,
        };
        self.cumulative_text.push_str(&text);

        let terminal = fields.is_terminal();
        let mut event = OutputEvent {
            token: Token {
                id: rand::random(),
                text,
                logprob: 0,
                special: terminal,
            },
            generated_text: None,
            details: None,
        };

        if terminal {
            // The terminal chunk itself is not counted as a generated token.
            event.generated_text = Some(self.cumulative_text.clone());
            event.details = Some(Details {
                finish_reason: fields.stop_reason.unwrap_or_default(),
                generated_tokens: self.token_count.saturating_sub(1),
                seed: None,
            });
            self.state = TranslatorState::Terminated;
        }

        Some(event)
    }
}

/// Translates a backend stream into events, yielding to the scheduler after each one.
///
/// The stream stops after the terminal event, or with the first backend error. Dropping it
/// drops `chunks` with it, which releases the backend connection.
pub fn translate(
    chunks: ChunkStream,
) -> impl Stream<Item = Result<OutputEvent, AdapterError>> + Send {
    async_stream::try_stream! {
        let mut chunks = chunks;
        let mut translator = StreamTranslator::new();

        while let Some(chunk) = chunks.next().await {
            if let Some(event) = translator.accept(chunk?) {
                yield event;
                tokio::task::yield_now().await;
            }
            if translator.is_terminated() {
                break;
            }
        }

        if !translator.is_terminated() {
            debug!(
                chunks = translator.token_count(),
                "backend stream ended without a stop reason"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::stream;
    use serde_json::json;

    use super::*;

    fn chunk(content: Option<&str>, stop_reason: Option<&str>) -> BackendChunk {
        BackendChunk::from_json(&json!({ "completion": content, "stop_reason": stop_reason }))
    }

    fn stream_of(chunks: Vec<BackendChunk>) -> ChunkStream {
        Box::pin(stream::iter(chunks.into_iter().map(Ok::<_, AdapterError>)))
    }

    #[test]
    fn parse_requires_both_keys() {
        assert_eq!(
            ChunkFields::parse(&chunk(Some("a"), None)),
            Some(ChunkFields {
                content: Some("a".into()),
                stop_reason: None
            })
        );
        assert_eq!(
            ChunkFields::parse(&BackendChunk::from_json(&json!({ "completion": "a" }))),
            None
        );
        assert_eq!(ChunkFields::parse(&BackendChunk::new("not json")), None);
        assert_eq!(
            ChunkFields::parse(&BackendChunk::from_json(
                &json!({ "completion": 5, "stop_reason": null })
            )),
            None
        );
    }

    #[test]
    fn literal_null_stop_reason_is_not_terminal() {
        assert!(!ChunkFields::parse(&chunk(Some("a"), Some("null"))).unwrap().is_terminal());
        assert!(!ChunkFields::parse(&chunk(Some("a"), None)).unwrap().is_terminal());
        assert!(
            ChunkFields::parse(&chunk(Some("a"), Some("stop_sequence")))
                .unwrap()
                .is_terminal()
        );
    }

    #[test]
    fn non_terminal_chunks_emit_one_event_each() {
        let mut translator = StreamTranslator::new();
        let contents = ["The", " quick", " brown", " fox"];
        let mut expected = String::new();

        for content in contents {
            let event = translator.accept(chunk(Some(content), None)).unwrap();
            expected.push_str(content);
            assert_eq!(event.token.text, content);
            assert_eq!(event.token.logprob, 0);
            assert!(!event.token.special);
            assert!(event.generated_text.is_none());
            assert!(event.details.is_none());
            assert_eq!(translator.cumulative_text(), expected);
        }
        assert_eq!(translator.state(), TranslatorState::Streaming);
    }

    #[test]
    fn terminal_chunk_carries_text_and_details() {
        let mut translator = StreamTranslator::new();
        let first = translator.accept(chunk(Some("Hello"), None)).unwrap();
        let last = translator.accept(chunk(Some(" world"), Some("length"))).unwrap();

        assert!(!first.token.special);
        assert!(last.token.special);
        assert!(last.is_terminal());
        assert_eq!(last.generated_text.as_deref(), Some("Hello world"));
        assert_eq!(
            last.details,
            Some(Details {
                finish_reason: "length".into(),
                generated_tokens: 1,
                seed: None,
            })
        );
        assert_eq!(translator.state(), TranslatorState::Terminated);
    }

    #[test]
    fn chunks_without_content_still_count() {
        let mut translator = StreamTranslator::new();
        assert!(translator.accept(chunk(Some("a"), None)).is_some());
        assert!(translator.accept(chunk(None, None)).is_none());
        assert!(translator.accept(chunk(Some(""), None)).is_none());
        assert!(translator.accept(BackendChunk::new("{}")).is_none());
        let last = translator.accept(chunk(Some("b"), Some("stop"))).unwrap();

        assert_eq!(last.generated_text.as_deref(), Some("ab"));
        assert_eq!(last.details.unwrap().generated_tokens, 4);
    }

    #[test]
    fn stop_reason_without_content_does_not_terminate() {
        let mut translator = StreamTranslator::new();
        assert!(translator.accept(chunk(None, Some("stop"))).is_none());
        assert_eq!(translator.state(), TranslatorState::Streaming);
    }

    #[test]
    fn chunks_after_termination_are_ignored() {
        let mut translator = StreamTranslator::new();
        translator.accept(chunk(Some("done"), Some("stop"))).unwrap();
        assert!(translator.accept(chunk(Some("late"), None)).is_none());
        assert_eq!(translator.cumulative_text(), "done");
        assert_eq!(translator.token_count(), 1);
    }

    #[tokio::test]
    async fn translate_preserves_order_and_stops_at_terminal() {
        let events: Vec<_> = translate(stream_of(vec![
            chunk(Some("Hello"), Some("null")),
            chunk(Some(" world"), Some("length")),
            chunk(Some(" ignored"), None),
        ]))
        .collect()
        .await;

        let events: Vec<_> = events.into_iter().map(Result::unwrap).collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].token.text, "Hello");
        assert_eq!(events[1].generated_text.as_deref(), Some("Hello world"));
    }

    // Streams may end without any real stop reason; that is a normal completion.
    #[tokio::test]
    async fn translate_without_stop_reason_has_no_terminal_event() {
        let events: Vec<_> = translate(stream_of(vec![
            chunk(Some("a"), None),
            chunk(Some("b"), Some("null")),
        ]))
        .collect()
        .await;

        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| !e.as_ref().unwrap().is_terminal()));
    }

    #[tokio::test]
    async fn translate_surfaces_mid_stream_failure_and_stops() {
        let chunks: ChunkStream = Box::pin(stream::iter(vec![
            Ok(chunk(Some("a"), None)),
            Err(AdapterError::Stream("connection reset".into())),
            Ok(chunk(Some("b"), Some("stop"))),
        ]));
        let events: Vec<_> = translate(chunks).collect().await;

        assert_eq!(events.len(), 2);
        assert!(events[0].is_ok());
        assert!(matches!(events[1], Err(AdapterError::Stream(_))));
    }
}
