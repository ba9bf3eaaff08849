//! Error types surfaced by the proxy pipeline.
//!
//! Every variant is recovered at the HTTP boundary and rendered as a JSON
//! body before any response byte is written.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Rate limit exceeded: {limit} requests per {window_secs} seconds")]
    RateLimited { limit: u64, window_secs: u64 },

    #[error("Failed to read request body: {0}")]
    RequestBody(String),

    #[error("Upstream did not respond within {0:?}")]
    UpstreamTimeout(Duration),

    #[error("Upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    #[error("Upstream request failed: {0}")]
    UpstreamRequest(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ProxyError::RequestBody(_) => StatusCode::BAD_REQUEST,
            ProxyError::UpstreamTimeout(_)
            | ProxyError::UpstreamUnreachable(_)
            | ProxyError::UpstreamRequest(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code for upstream failures.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            ProxyError::UpstreamTimeout(_) => Some("UPSTREAM_TIMEOUT"),
            ProxyError::UpstreamUnreachable(_) => Some("UPSTREAM_CONNECT"),
            ProxyError::UpstreamRequest(_) => Some("UPSTREAM_REQUEST"),
            _ => None,
        }
    }

    /// Label used for request metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            ProxyError::RateLimited { .. } => "rate_limited",
            ProxyError::RequestBody(_) => "bad_request",
            _ => "upstream_error",
        }
    }

    /// Build an upstream error from a `reqwest` failure.
    pub fn from_upstream(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            ProxyError::UpstreamTimeout(timeout)
        } else if err.is_connect() {
            ProxyError::UpstreamUnreachable(err.to_string())
        } else {
            ProxyError::UpstreamRequest(err.to_string())
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ProxyError::RateLimited { .. } => json!({
                "error": "Too many requests",
                "message": self.to_string(),
            }),
            ProxyError::RequestBody(_) => json!({
                "error": "Invalid request",
                "message": self.to_string(),
            }),
            _ => json!({
                "error": "Proxy error occurred",
                "message": self.to_string(),
                "code": self.code(),
            }),
        };
        (status, Json(body)).into_response()
    }
}

/// Failures that prevent the proxy from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Invalid upstream URL: {0}")]
    InvalidUpstream(#[from] url::ParseError),

    #[error("Failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
