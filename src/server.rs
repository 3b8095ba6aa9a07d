use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    response::Response,
    routing::{get, post},
};
use futures::StreamExt;
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    backend::{Backend, ChunkStream},
    config::AppConfig,
    error::AdapterError,
    model::{GenerationDefaults, GenerationRequest, GenerationResponse, resolve},
    translate::translate,
    transport::event_stream_response,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub backend: Arc<dyn Backend>,
}

#[derive(Serialize)]
struct InfoResponse {
    model_id: String,
    default_max_tokens: i64,
    default_temperature: f64,
    version: &'static str,
}

pub fn build_router(config: Arc<AppConfig>, backend: Arc<dyn Backend>) -> Router {
    let state = AppState { config, backend };

    Router::new()
        .route("/health", get(health))
        .route("/info", get(info))
        .route("/generate", post(generate))
        .route("/generate_stream", post(generate_stream))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "ok"
}

async fn info(State(state): State<AppState>) -> Json<InfoResponse> {
    let GenerationDefaults {
        max_tokens,
        temperature,
    } = state.config.defaults;

    Json(InfoResponse {
        model_id: state.backend.model_id().to_string(),
        default_max_tokens: max_tokens,
        default_temperature: temperature,
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn generate_stream(
    State(state): State<AppState>,
    Json(request): Json<GenerationRequest>,
) -> Result<Response, AdapterError> {
    let chunks = open_stream(&state, &request).await?;
    Ok(event_stream_response(translate(chunks)))
}

async fn generate(
    State(state): State<AppState>,
    Json(request): Json<GenerationRequest>,
) -> Result<Json<GenerationResponse>, AdapterError> {
    let chunks = open_stream(&state, &request).await?;
    let mut events = Box::pin(translate(chunks));

    let mut response = GenerationResponse {
        generated_text: String::new(),
        details: None,
    };
    while let Some(event) = events.next().await {
        let event = event?;
        match event.generated_text {
            Some(text) => {
                response.generated_text = text;
                response.details = event.details;
            }
            None => response.generated_text.push_str(&event.token.text),
        }
    }

    Ok(Json(response))
}

async fn open_stream(
    state: &AppState,
    request: &GenerationRequest,
) -> Result<ChunkStream, AdapterError> {
    if request.inputs.trim().is_empty() {
        return Err(AdapterError::BadRequest("inputs must not be empty".into()));
    }

    let parameters = resolve(request, &state.config.defaults);
    info!(
        model_id = state.backend.model_id(),
        max_tokens = parameters.max_tokens,
        temperature = parameters.temperature,
        prompt_chars = request.inputs.chars().count(),
        "starting generation"
    );

    state
        .backend
        .invoke_streaming(&request.inputs, parameters)
        .await
}
