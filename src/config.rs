use std::{
    env,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

use crate::model::GenerationDefaults;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub model_id: String,
    pub backend_url: String,
    pub backend_api_key: Option<String>,
    pub backend_connect_timeout: Duration,
    pub defaults: GenerationDefaults,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let listen_addr = env::var("SERVER_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".into())
            .parse()
            .unwrap_or_else(|_| SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080));

        let model_id = env::var("MODEL_ID").unwrap_or_else(|_| "anthropic.claude-v2".to_string());
        let backend_url =
            env::var("BACKEND_URL").unwrap_or_else(|_| "http://127.0.0.1:9000".to_string());
        let backend_api_key = env::var("BACKEND_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        let backend_connect_timeout = env::var("BACKEND_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(10));

        let fallback = GenerationDefaults::default();
        let max_tokens = env::var("DEFAULT_MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(fallback.max_tokens);
        let temperature = env::var("DEFAULT_TEMPERATURE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(fallback.temperature);

        Ok(Self {
            listen_addr,
            model_id,
            backend_url,
            backend_api_key,
            backend_connect_timeout,
            defaults: GenerationDefaults {
                max_tokens,
                temperature,
            },
        })
    }

    /// Configuration pointing at `backend_url` with every other field at its default.
    pub fn for_backend(backend_url: impl Into<String>) -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080),
            model_id: "anthropic.claude-v2".to_string(),
            backend_url: backend_url.into(),
            backend_api_key: None,
            backend_connect_timeout: Duration::from_secs(10),
            defaults: GenerationDefaults::default(),
        }
    }
}
