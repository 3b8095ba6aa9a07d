use serde::{Deserialize, Serialize};

/// Inbound body of `/generate` and `/generate_stream`.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationRequest {
    pub inputs: String,
    #[serde(default)]
    pub parameters: Option<GenerationParameters>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationParameters {
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<i64>,
}

/// One record of the token stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputEvent {
    pub token: Token,
    pub generated_text: Option<String>,
    pub details: Option<Details>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub id: u32,
    pub text: String,
    /// The backend reports no log-probabilities; always 0.
    pub logprob: i32,
    pub special: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Details {
    pub finish_reason: String,
    pub generated_tokens: u32,
    pub seed: Option<u64>,
}

impl OutputEvent {
    pub fn is_terminal(&self) -> bool {
        self.token.special
    }
}

/// Body of the non-streaming `/generate` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub generated_text: String,
    pub details: Option<Details>,
}
