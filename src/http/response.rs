//! Locally generated responses.
//!
//! Proxied responses are assembled by the forwarding engine; this module
//! only builds the bodies the proxy answers on its own.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub target: String,
    pub timestamp: String,
}

impl HealthStatus {
    pub fn ok(target: &str, now: DateTime<Utc>) -> Self {
        Self {
            status: "OK",
            target: target.to_string(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}
