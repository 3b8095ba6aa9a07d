use serde::Serialize;

use crate::model::GenerationRequest;

pub const DEFAULT_MAX_TOKENS: i64 = 100;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Values used for any generation parameter the caller leaves out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationDefaults {
    pub max_tokens: i64,
    pub temperature: f64,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// Parameters handed to the backend, already merged with the defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedParameters {
    pub max_tokens: i64,
    pub temperature: f64,
}

/// Each field falls back to its default on its own. Out-of-range values pass through untouched.
pub fn resolve(request: &GenerationRequest, defaults: &GenerationDefaults) -> ResolvedParameters {
    let parameters = request.parameters.as_ref();
    ResolvedParameters {
        max_tokens: parameters
            .and_then(|p| p.max_tokens)
            .unwrap_or(defaults.max_tokens),
        temperature: parameters
            .and_then(|p| p.temperature)
            .unwrap_or(defaults.temperature),
    }
}
