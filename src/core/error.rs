//! Error types and handling for the relay.
//!
//! Per-request failures are converted to [`ProxyError`] and rendered as
//! structured JSON error responses. Startup failures use `anyhow` and abort
//! the process instead.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub const ERROR_TYPE_API: &str = "api_error";
pub const ERROR_TYPE_TIMEOUT: &str = "timeout_error";

/// Failures the proxy itself produces.
///
/// Upstream non-2xx statuses are deliberately absent: those are relayed
/// verbatim so the caller sees the provider's own error semantics.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Outbound connect failed or the connect timeout elapsed
    #[error("Failed to reach upstream provider")]
    UpstreamUnreachable,

    /// No response head from the upstream within the idle window
    #[error("No response from upstream within {idle_secs} seconds")]
    UpstreamTimeout { idle_secs: u64 },

    /// Inbound connection closed before the request was fully received.
    /// A normal scenario (user cancelled, client gave up), never an upstream
    /// problem.
    #[error("Caller closed request")]
    CallerDisconnected,

    /// Generic internal errors with custom message
    #[error("Internal proxy error: {0}")]
    Internal(String),
}

impl ProxyError {
    /// Classify an outbound transport failure.
    ///
    /// Messages are fixed strings: `reqwest::Error` text can embed the
    /// upstream URL, which must not reach the caller.
    pub fn from_transport(error: &reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            ProxyError::UpstreamUnreachable
        } else {
            ProxyError::Internal("Upstream request failed".to_string())
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, error_type) = match self {
            ProxyError::UpstreamUnreachable => (StatusCode::BAD_GATEWAY, ERROR_TYPE_API),
            ProxyError::UpstreamTimeout { .. } => {
                (StatusCode::GATEWAY_TIMEOUT, ERROR_TYPE_TIMEOUT)
            }
            ProxyError::CallerDisconnected => {
                // HTTP 408 per RFC 7231, more compatible than nginx's 499
                (StatusCode::REQUEST_TIMEOUT, ERROR_TYPE_API)
            }
            ProxyError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ERROR_TYPE_API),
        };

        let body = Json(json!({
            "error": {
                "message": message,
                "type": error_type,
                "code": status.as_u16()
            }
        }));

        (status, body).into_response()
    }
}

/// Convenience type alias for Results using [`ProxyError`].
pub type Result<T> = std::result::Result<T, ProxyError>;
