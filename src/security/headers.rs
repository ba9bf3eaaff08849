//! Outbound header rewriting.
//!
//! # Responsibilities
//! - Overlay a static browser-like header profile on the upstream request
//! - Point `Host` and `Referer` at the upstream origin
//! - Strip hop-by-hop and proxy-chain headers so the upstream never learns
//!   a proxy sits in front of it
//!
//! The policy is a pure function of the inbound headers and its
//! construction-time table.

use axum::http::{
    header::{self, HeaderName},
    HeaderMap, HeaderValue,
};
use url::Url;

use crate::config::{HeaderMode, HeaderPolicyConfig};

/// Headers that only describe a single network leg.
pub const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Headers that reveal a proxy chain.
pub const PROXY_CHAIN: &[&str] = &[
    "x-forwarded-for",
    "x-forwarded-proto",
    "x-forwarded-host",
    "x-forwarded-port",
    "forwarded",
    "via",
    "x-real-ip",
    "x-request-id",
];

/// Client headers never carried upstream; the HTTP client owns these.
const CLIENT_MANAGED: &[&str] = &["host", "content-length", "accept-encoding"];

/// Remove hop-by-hop headers, including any listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}

/// Rewrites client headers into upstream request headers.
#[derive(Debug, Clone)]
pub struct OutboundHeaderPolicy {
    mode: HeaderMode,
    allowlist: Vec<HeaderName>,
    profile: Vec<(HeaderName, HeaderValue)>,
    host: HeaderValue,
    referer: HeaderValue,
}

impl OutboundHeaderPolicy {
    pub fn new(config: &HeaderPolicyConfig, upstream: &Url) -> Self {
        let allowlist = config
            .strict_allowlist
            .iter()
            .filter_map(|name| HeaderName::from_bytes(name.as_bytes()).ok())
            .collect();

        let configured = [
            (header::USER_AGENT, config.user_agent.as_str()),
            (header::ACCEPT, config.accept.as_str()),
            (header::ACCEPT_LANGUAGE, config.accept_language.as_str()),
        ];
        let fixed = [
            (header::CACHE_CONTROL, "no-cache"),
            (header::PRAGMA, "no-cache"),
            (HeaderName::from_static("sec-fetch-dest"), "document"),
            (HeaderName::from_static("sec-fetch-mode"), "navigate"),
            (HeaderName::from_static("sec-fetch-site"), "none"),
            (HeaderName::from_static("sec-fetch-user"), "?1"),
            (header::UPGRADE_INSECURE_REQUESTS, "1"),
        ];

        let mut profile = Vec::with_capacity(configured.len() + fixed.len());
        for (name, value) in configured.into_iter().chain(fixed) {
            match HeaderValue::from_str(value) {
                Ok(v) => profile.push((name, v)),
                Err(_) => tracing::warn!(header = %name, "ignoring invalid profile header value"),
            }
        }

        let authority = match (upstream.host_str(), upstream.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => String::new(),
        };

        Self {
            mode: config.mode,
            allowlist,
            profile,
            host: HeaderValue::from_str(&authority).unwrap_or_else(|_| HeaderValue::from_static("")),
            referer: HeaderValue::from_str(upstream.as_str())
                .unwrap_or_else(|_| HeaderValue::from_static("/")),
        }
    }

    /// Produce the upstream request headers for an inbound request.
    pub fn apply(&self, inbound: &HeaderMap) -> HeaderMap {
        let mut outbound = match self.mode {
            HeaderMode::Permissive => {
                let mut copied = inbound.clone();
                strip_hop_by_hop(&mut copied);
                for name in PROXY_CHAIN.iter().chain(CLIENT_MANAGED) {
                    copied.remove(*name);
                }
                copied
            }
            HeaderMode::Strict => {
                let mut copied = HeaderMap::new();
                for name in &self.allowlist {
                    for value in inbound.get_all(name) {
                        copied.append(name.clone(), value.clone());
                    }
                }
                copied
            }
        };

        for (name, value) in &self.profile {
            outbound.insert(name.clone(), value.clone());
        }
        outbound.insert(header::HOST, self.host.clone());
        outbound.insert(header::REFERER, self.referer.clone());

        outbound
    }
}
