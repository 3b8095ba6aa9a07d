use std::fmt::Display;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use reqwest::{StatusCode, header::ACCEPT};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    backend::{Backend, BackendChunk, ChunkStream},
    config::AppConfig,
    error::AdapterError,
    model::ResolvedParameters,
};

#[derive(Debug, Serialize)]
struct InvokeBody<'a> {
    prompt: &'a str,
    max_tokens_to_sample: i64,
    temperature: f64,
}

/// Backend reached over HTTP. The response body is newline-delimited JSON, one chunk per line.
pub struct HttpBackend {
    client: reqwest::Client,
    model_id: String,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &AppConfig) -> Result<Self, AdapterError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.backend_connect_timeout)
            .build()
            .map_err(|e| AdapterError::Other(format!("failed to build http client: {e}")))?;

        let endpoint = format!(
            "{}/model/{}/invoke-with-response-stream",
            config.backend_url.trim_end_matches('/'),
            config.model_id
        );

        Ok(Self {
            client,
            model_id: config.model_id.clone(),
            endpoint,
            api_key: config.backend_api_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Backend for HttpBackend {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn invoke_streaming(
        &self,
        prompt: &str,
        parameters: ResolvedParameters,
    ) -> Result<ChunkStream, AdapterError> {
        let body = InvokeBody {
            prompt,
            max_tokens_to_sample: parameters.max_tokens,
            temperature: parameters.temperature,
        };

        let mut request = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, "application/json")
            .json(&body);
        if let Some(key) = self.api_key.as_deref() {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AdapterError::BackendUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(%status, model_id = %self.model_id, "backend refused streaming invocation");
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    AdapterError::BackendRejected {
                        status: status.as_u16(),
                        message,
                    }
                }
                _ => AdapterError::BackendStatus {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        debug!(model_id = %self.model_id, "backend stream opened");
        Ok(Box::pin(split_chunks(response.bytes_stream())))
    }
}

/// Re-frames a byte stream into one chunk per non-blank line. Lines may span reads.
pub(crate) fn split_chunks<S, E>(
    bytes: S,
) -> impl Stream<Item = Result<BackendChunk, AdapterError>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    async_stream::try_stream! {
        let mut bytes = Box::pin(bytes);
        let mut buffer = BytesMut::new();

        while let Some(piece) = bytes.next().await {
            let piece = piece.map_err(|e| AdapterError::Stream(e.to_string()))?;
            buffer.extend_from_slice(&piece);

            while let Some(end) = buffer.iter().position(|&b| b == b'\n') {
                let line = buffer.split_to(end + 1);
                if let Some(chunk) = line_to_chunk(&line[..end]) {
                    yield chunk;
                }
            }
        }

        if let Some(chunk) = line_to_chunk(&buffer) {
            yield chunk;
        }
    }
}

fn line_to_chunk(line: &[u8]) -> Option<BackendChunk> {
    let line = line.trim_ascii();
    (!line.is_empty()).then(|| BackendChunk::new(Bytes::copy_from_slice(line)))
}
