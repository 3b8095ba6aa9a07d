use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("invalid request: {0}")]
    BadRequest(String),
    #[error("backend unreachable: {0}")]
    BackendUnavailable(String),
    #[error("backend rejected the request ({status}): {message}")]
    BackendRejected { status: u16, message: String },
    #[error("backend returned status {status}: {message}")]
    BackendStatus { status: u16, message: String },
    #[error("backend stream failed: {0}")]
    Stream(String),
    #[error("event encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("other: {0}")]
    Other(String),
}

impl IntoResponse for AdapterError {
    fn into_response(self) -> Response {
        let status = match self {
            AdapterError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AdapterError::BackendUnavailable(_)
            | AdapterError::BackendRejected { .. }
            | AdapterError::BackendStatus { .. }
            | AdapterError::Stream(_) => StatusCode::BAD_GATEWAY,
            AdapterError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AdapterError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::warn!(%status, error = %self, "request failed");
        }

        let body = serde_json::json!({
            "error": self.to_string(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_failures_map_to_bad_gateway() {
        let response = AdapterError::BackendRejected {
            status: 403,
            message: "AccessDeniedException".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let response = AdapterError::BackendUnavailable("connection refused".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn bad_request_maps_to_400() {
        let response = AdapterError::BadRequest("inputs must not be empty".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
