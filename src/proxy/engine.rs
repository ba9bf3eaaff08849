//! The forwarding pipeline.
//!
//! ```text
//! Received
//!     → admission (ClientWindowTracker)        → RateLimited (429)
//!     → cache lookup (ResponseCache, GET only) → CacheHit (stored response)
//!     → outbound headers (OutboundHeaderPolicy)
//!     → upstream call (deadline-bounded)       → error (500)
//!     → redirect check (RedirectPolicy)        → Blocked (200 JSON)
//!     → sanitize HTML or pass through
//!     → cache store when 200 with a body
//!     → Responded
//! ```

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use url::Url;

use crate::cache::{cache_key, ResponseCache};
use crate::config::ProxyConfig;
use crate::error::{ProxyError, StartupError};
use crate::observability::metrics;
use crate::proxy::upstream::{Buffered, UpstreamClient};
use crate::security::{
    headers::strip_hop_by_hop, Admission, ClientWindowTracker, OutboundHeaderPolicy,
    RedirectDecision, RedirectPolicy,
};
use crate::transform::ContentSanitizer;

/// Sequences admission, caching, header rewriting, redirect interception
/// and HTML sanitization around one upstream call.
pub struct ForwardingEngine {
    upstream: UpstreamClient,
    tracker: Option<Arc<ClientWindowTracker>>,
    cache: Option<Arc<ResponseCache>>,
    headers: OutboundHeaderPolicy,
    redirects: RedirectPolicy,
    sanitizer: Option<ContentSanitizer>,
    max_body_size: usize,
    max_cache_entry_bytes: usize,
    max_sanitize_bytes: usize,
}

impl ForwardingEngine {
    /// Build the engine and its stores from configuration.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, StartupError> {
        let tracker = config
            .rate_limit
            .enabled
            .then(|| Arc::new(ClientWindowTracker::from_config(&config.rate_limit)));
        let cache = config
            .cache
            .enabled
            .then(|| Arc::new(ResponseCache::from_config(&config.cache)));

        Self::new(config, tracker, cache)
    }

    /// Build the engine around externally owned stores.
    pub fn new(
        config: &ProxyConfig,
        tracker: Option<Arc<ClientWindowTracker>>,
        cache: Option<Arc<ResponseCache>>,
    ) -> Result<Self, StartupError> {
        let upstream = UpstreamClient::new(&config.upstream)?;
        let headers = OutboundHeaderPolicy::new(&config.headers, upstream.base_url());
        let redirects = RedirectPolicy::new(upstream.base_url());

        Ok(Self {
            upstream,
            tracker,
            cache,
            headers,
            redirects,
            sanitizer: config.sanitizer.enabled.then(ContentSanitizer::new),
            max_body_size: config.security.max_body_size,
            max_cache_entry_bytes: config.cache.max_entry_bytes,
            max_sanitize_bytes: config.sanitizer.max_body_bytes,
        })
    }

    pub fn upstream_url(&self) -> &Url {
        self.upstream.base_url()
    }

    pub fn tracker(&self) -> Option<&Arc<ClientWindowTracker>> {
        self.tracker.as_ref()
    }

    pub fn cache(&self) -> Option<&Arc<ResponseCache>> {
        self.cache.as_ref()
    }

    /// Run one inbound request through the pipeline.
    pub async fn handle(&self, client_id: &str, request: Request<Body>) -> Response {
        let start = Instant::now();
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let (outcome, response) = match self.forward(client_id, request).await {
            Ok(done) => done,
            Err(e) => {
                if let Some(code) = e.code() {
                    metrics::record_upstream_error(code);
                    tracing::error!(client = %client_id, method = %method, path = %path, error = %e, "Proxy error");
                }
                (e.outcome(), e.into_response())
            }
        };

        tracing::debug!(
            client = %client_id,
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            outcome,
            "Request complete"
        );
        metrics::record_request(method.as_str(), response.status().as_u16(), outcome, start);
        response
    }

    async fn forward(
        &self,
        client_id: &str,
        request: Request<Body>,
    ) -> Result<(&'static str, Response), ProxyError> {
        // 1. Admission
        if let Some(tracker) = &self.tracker {
            if tracker.admit(client_id) == Admission::Rejected {
                metrics::record_rate_limited();
                tracing::warn!(client = %client_id, "Rate limit exceeded");
                return Err(ProxyError::RateLimited {
                    limit: tracker.max_requests(),
                    window_secs: tracker.window().as_secs(),
                });
            }
        }

        // 2. Cache lookup
        let key = match (&self.cache, request.method()) {
            (Some(_), &Method::GET) => Some(cache_key(request.method(), request.uri())),
            _ => None,
        };
        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            if let Some(hit) = cache.lookup(key) {
                tracing::debug!(key = %key, "Cache hit");
                return Ok(("cache_hit", hit.to_response()));
            }
        }

        // 3. Outbound request
        let (parts, body) = request.into_parts();
        let target = self.upstream.target_url(&parts.uri);
        let outbound_headers = self.headers.apply(&parts.headers);
        let body = axum::body::to_bytes(body, self.max_body_size)
            .await
            .map_err(|e| ProxyError::RequestBody(e.to_string()))?;

        tracing::debug!(method = %parts.method, target = %target, "Forwarding to upstream");

        let deadline = self.upstream.deadline();
        let upstream = self
            .upstream
            .send(parts.method.clone(), target.clone(), outbound_headers, body, deadline)
            .await?;

        let status = upstream.status();
        let mut headers = upstream.headers().clone();
        strip_hop_by_hop(&mut headers);

        // 4. Redirect check
        let decision = self.redirect_decision(status, &headers, &target);
        match &decision {
            RedirectDecision::PassThrough => {}
            RedirectDecision::Rewritten(path) => {
                metrics::record_redirect(decision.label());
                tracing::info!(status = status.as_u16(), location = %path, "Rewrote upstream redirect");
                match HeaderValue::from_str(path) {
                    Ok(value) => {
                        headers.insert(header::LOCATION, value);
                    }
                    Err(_) => {
                        headers.remove(header::LOCATION);
                    }
                }
            }
            RedirectDecision::Blocked(location) => {
                metrics::record_redirect(decision.label());
                tracing::warn!(status = status.as_u16(), location = %location, "Blocking external redirect");
                return Ok(("redirect_blocked", blocked_redirect_response(location)));
            }
        }

        // 5. Sanitize or pass through
        if self.sanitizer.is_some() {
            ContentSanitizer::strip_refresh_headers(&mut headers);
        }

        // HEAD answers carry no body; keep the upstream's Content-Length.
        if let Some(sanitizer) = &self.sanitizer {
            if status == StatusCode::OK
                && parts.method != Method::HEAD
                && ContentSanitizer::applies_to(&headers)
            {
                return match self
                    .upstream
                    .buffer_up_to(upstream, self.max_sanitize_bytes, deadline)
                    .await?
                {
                    Buffered::Complete(raw) => {
                        let body = sanitizer.sanitize(&mut headers, &raw);
                        self.store_if_eligible(key.as_deref(), status, &headers, &body);
                        Ok(("sanitized", build_response(status, headers, Body::from(body))))
                    }
                    Buffered::Overflow(body) => {
                        tracing::warn!(
                            limit = self.max_sanitize_bytes,
                            "HTML body too large to sanitize, streaming unchanged"
                        );
                        Ok(("forwarded", build_response(status, headers, body)))
                    }
                };
            }
        }

        if key.is_some() && status == StatusCode::OK {
            return match self
                .upstream
                .buffer_up_to(upstream, self.max_cache_entry_bytes, deadline)
                .await?
            {
                Buffered::Complete(body) => {
                    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
                    self.store_if_eligible(key.as_deref(), status, &headers, &body);
                    Ok(("forwarded", build_response(status, headers, Body::from(body))))
                }
                Buffered::Overflow(body) => Ok(("forwarded", build_response(status, headers, body))),
            };
        }

        let body = Body::from_stream(upstream.bytes_stream());
        Ok(("forwarded", build_response(status, headers, body)))
    }

    fn redirect_decision(
        &self,
        status: StatusCode,
        headers: &HeaderMap,
        target: &Url,
    ) -> RedirectDecision {
        match headers.get(header::LOCATION) {
            None => self.redirects.evaluate(status, None, target),
            Some(value) => match value.to_str() {
                Ok(location) => self.redirects.evaluate(status, Some(location), target),
                // A redirect we cannot read is not followed.
                Err(_) if status.is_redirection() => {
                    RedirectDecision::Blocked(String::from_utf8_lossy(value.as_bytes()).into_owned())
                }
                Err(_) => RedirectDecision::PassThrough,
            },
        }
    }

    fn store_if_eligible(
        &self,
        key: Option<&str>,
        status: StatusCode,
        headers: &HeaderMap,
        body: &Bytes,
    ) {
        if let (Some(cache), Some(key)) = (&self.cache, key) {
            if status == StatusCode::OK && !body.is_empty() && body.len() <= self.max_cache_entry_bytes {
                cache.store(key, status, headers.clone(), body.clone());
                tracing::debug!(key = %key, bytes = body.len(), "Cached response");
            }
        }
    }
}

fn build_response(status: StatusCode, headers: HeaderMap, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// `200` JSON shown instead of an off-origin redirect.
pub fn blocked_redirect_response(location: &str) -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "message": "External redirect blocked",
            "redirect_url": location,
        })),
    )
        .into_response()
}
