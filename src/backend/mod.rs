//! Backend inference service seam.
//!
//! The adapter needs a single capability from the backend: start a streaming generation and
//! hand back the raw chunks as they arrive. Everything about how a chunk is laid out is left
//! to the translator, so a chunk is carried here as opaque bytes.

mod http;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde_json::Value;

use crate::{error::AdapterError, model::ResolvedParameters};

pub use http::HttpBackend;

/// Chunks of one streaming generation, in arrival order.
///
/// An `Err` item means the stream broke mid-flight and no further chunk follows. Dropping the
/// stream releases the underlying connection.
pub type ChunkStream = BoxStream<'static, Result<BackendChunk, AdapterError>>;

#[async_trait]
pub trait Backend: Send + Sync {
    fn model_id(&self) -> &str;

    /// Starts a generation. Connection and authorization failures are reported here, before
    /// any chunk is produced.
    async fn invoke_streaming(
        &self,
        prompt: &str,
        parameters: ResolvedParameters,
    ) -> Result<ChunkStream, AdapterError>;
}

/// One unit of the backend stream, not yet interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendChunk {
    payload: Bytes,
}

impl BackendChunk {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    pub fn from_json(value: &Value) -> Self {
        Self::new(value.to_string())
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}
