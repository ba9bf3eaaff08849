//! TTL-keyed store of served responses.

use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::Response,
};
use dashmap::DashMap;

use crate::config::CacheConfig;
use crate::observability::metrics;

/// A stored response, replayed verbatim on a hit.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub stored_at: Instant,
}

impl CachedResponse {
    pub fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.stored_at) < ttl
    }

    /// Rebuild the client response.
    pub fn to_response(&self) -> Response {
        let mut response = Response::new(Body::from(self.body.clone()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers.clone();
        response
    }
}

/// Cache key: method plus path and query.
pub fn cache_key(method: &Method, uri: &Uri) -> String {
    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    format!("{} {}", method, path)
}

#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    max_entries: usize,
    entries: DashMap<String, CachedResponse>,
}

impl ResponseCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            entries: DashMap::new(),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(Duration::from_secs(config.ttl_secs), config.max_entries)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn lookup(&self, key: &str) -> Option<CachedResponse> {
        self.lookup_at(key, Instant::now())
    }

    /// Fresh entry for `key`; stale rows are left in place.
    pub fn lookup_at(&self, key: &str, now: Instant) -> Option<CachedResponse> {
        let hit = self
            .entries
            .get(key)
            .filter(|e| e.value().is_fresh(now, self.ttl))
            .map(|e| e.value().clone());

        metrics::record_cache_event(if hit.is_some() { "hit" } else { "miss" });
        hit
    }

    pub fn store(&self, key: &str, status: StatusCode, headers: HeaderMap, body: Bytes) {
        self.store_at(key, status, headers, body, Instant::now());
    }

    /// Overwrite the entry for `key`.
    pub fn store_at(
        &self,
        key: &str,
        status: StatusCode,
        headers: HeaderMap,
        body: Bytes,
        now: Instant,
    ) {
        if !self.entries.contains_key(key) && self.entries.len() >= self.max_entries {
            self.evict(now);
        }

        self.entries.insert(
            key.to_string(),
            CachedResponse {
                status,
                headers,
                body,
                stored_at: now,
            },
        );
        metrics::record_cache_event("store");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop stale entries. Returns the number removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, e| e.is_fresh(now, ttl));
        let removed = before.saturating_sub(self.entries.len());
        metrics::record_tracked_entries("cache", self.entries.len());
        removed
    }

    fn evict(&self, now: Instant) {
        if self.sweep(now) > 0 && self.entries.len() < self.max_entries {
            return;
        }

        let oldest = self
            .entries
            .iter()
            .min_by_key(|e| e.value().stored_at)
            .map(|e| e.key().clone());

        if let Some(key) = oldest {
            self.entries.remove(&key);
            metrics::record_cache_event("evict");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(30);

    fn headers() -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert("content-type", "text/plain".parse().unwrap());
        h.insert("x-origin", "upstream".parse().unwrap());
        h
    }

    #[test]
    fn key_combines_method_path_and_query() {
        let uri: Uri = "/search?q=rust".parse().unwrap();
        assert_eq!(cache_key(&Method::GET, &uri), "GET /search?q=rust");
        assert_ne!(cache_key(&Method::GET, &uri), cache_key(&Method::HEAD, &uri));
    }

    #[test]
    fn hit_within_ttl_miss_after() {
        let cache = ResponseCache::new(TTL, 10);
        let t0 = Instant::now();
        cache.store_at("GET /x", StatusCode::OK, headers(), Bytes::from_static(b"hello"), t0);

        let hit = cache.lookup_at("GET /x", t0 + Duration::from_secs(29)).unwrap();
        assert_eq!(hit.body, Bytes::from_static(b"hello"));
        assert_eq!(hit.headers, headers());

        assert!(cache.lookup_at("GET /x", t0 + TTL).is_none());
        // Stale rows linger until swept or overwritten.
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn store_overwrites() {
        let cache = ResponseCache::new(TTL, 10);
        let t0 = Instant::now();
        cache.store_at("GET /x", StatusCode::OK, headers(), Bytes::from_static(b"one"), t0);
        cache.store_at("GET /x", StatusCode::OK, headers(), Bytes::from_static(b"two"), t0);
        assert_eq!(cache.lookup_at("GET /x", t0).unwrap().body, Bytes::from_static(b"two"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn full_cache_evicts_oldest() {
        let cache = ResponseCache::new(TTL, 2);
        let t0 = Instant::now();
        let body = Bytes::from_static(b"x");
        cache.store_at("a", StatusCode::OK, HeaderMap::new(), body.clone(), t0);
        cache.store_at("b", StatusCode::OK, HeaderMap::new(), body.clone(), t0 + Duration::from_secs(1));
        cache.store_at("c", StatusCode::OK, HeaderMap::new(), body, t0 + Duration::from_secs(2));

        assert_eq!(cache.len(), 2);
        assert!(cache.lookup_at("a", t0 + Duration::from_secs(2)).is_none());
        assert!(cache.lookup_at("c", t0 + Duration::from_secs(2)).is_some());
    }

    #[test]
    fn replay_reproduces_status_headers_body() {
        let cache = ResponseCache::new(TTL, 10);
        cache.store("GET /x", StatusCode::OK, headers(), Bytes::from_static(b"body"));
        let response = cache.lookup("GET /x").unwrap().to_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers(), &headers());
    }
}
