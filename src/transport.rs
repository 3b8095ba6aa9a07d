//! Event-stream framing for translated events.
//!
//! Each event is written as `data:<compact json>` followed by a blank line. The terminal event
//! gets one extra line break; receivers should only rely on the blank line.

use axum::{
    body::Body,
    http::{HeaderValue, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::{Stream, StreamExt};

use crate::{error::AdapterError, model::OutputEvent};

pub const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream";

const RECORD_SEPARATOR: &str = "\n\n";
const TERMINAL_RECORD_SEPARATOR: &str = "\n\n\n";

pub fn encode_record(event: &OutputEvent) -> Result<Bytes, AdapterError> {
    let json = serde_json::to_string(event)?;
    let separator = if event.is_terminal() {
        TERMINAL_RECORD_SEPARATOR
    } else {
        RECORD_SEPARATOR
    };

    let mut record = String::with_capacity(5 + json.len() + separator.len());
    record.push_str("data:");
    record.push_str(&json);
    record.push_str(separator);
    Ok(Bytes::from(record))
}

/// Streams `events` to the client, one body frame per record.
///
/// An `Err` item aborts the body, leaving the client with a truncated stream. If the client goes
/// away, the body (and with it `events`) is dropped.
pub fn event_stream_response<S>(events: S) -> Response
where
    S: Stream<Item = Result<OutputEvent, AdapterError>> + Send + 'static,
{
    let records = events.map(|event| {
        let record = event.and_then(|event| encode_record(&event));
        if let Err(error) = &record {
            tracing::warn!(%error, "token stream truncated");
        }
        record
    });

    let mut response = Body::from_stream(records).into_response();
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static(EVENT_STREAM_CONTENT_TYPE),
    );
    response
}
