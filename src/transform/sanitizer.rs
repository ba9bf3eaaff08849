//! HTML auto-refresh stripping.
//!
//! Removes, in order:
//! 1. `<meta http-equiv="refresh" ...>` tags
//! 2. `setTimeout(...)` / `setInterval(...)` calls with a numeric delay
//! 3. `window.location.reload()` calls
//!
//! These are byte-level substitutions, not a DOM parse, so pages in any
//! ASCII-compatible charset keep every unmatched byte. Timer arguments may
//! contain one level of nested parentheses; anything deeper is left alone.

use axum::{
    body::Bytes,
    http::{header, HeaderMap, HeaderValue},
};
use regex::bytes::Regex;

/// Response headers that trigger a client-side refresh.
pub const REFRESH_HEADERS: &[&str] = &["refresh", "x-refresh"];

/// Compiled auto-refresh patterns.
#[derive(Debug, Clone)]
pub struct ContentSanitizer {
    meta_refresh: Regex,
    timers: Regex,
    reload: Regex,
}

impl ContentSanitizer {
    pub fn new() -> Self {
        // Patterns are constants; a failure here is a programming error.
        Self {
            meta_refresh: Regex::new(
                r#"(?is-u)<meta\b[^>]*\shttp-equiv\s*=\s*["']?\s*refresh(?:["'\s/][^>]*)?>"#,
            )
            .expect("meta refresh pattern"),
            timers: Regex::new(
                r"(?s-u)\bset(?:Timeout|Interval)\s*\((?:[^()]|\([^()]*\))*?,\s*\d+(?:\.\d+)?\s*\)\s*;?",
            )
            .expect("timer pattern"),
            reload: Regex::new(r"(?-u)\bwindow\.location\.reload\s*\(\s*(?:true|false)?\s*\)\s*;?")
                .expect("reload pattern"),
        }
    }

    /// True when `headers` describe an HTML body.
    pub fn applies_to(headers: &HeaderMap) -> bool {
        headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.to_ascii_lowercase().contains("text/html"))
            .unwrap_or(false)
    }

    /// Strip auto-refresh directives from an HTML document.
    pub fn strip(&self, html: &[u8]) -> Vec<u8> {
        let html = self.meta_refresh.replace_all(html, &b""[..]);
        let html = self.timers.replace_all(&html, &b""[..]);
        let html = self.reload.replace_all(&html, &b""[..]);
        html.into_owned()
    }

    /// Sanitize a buffered body and fix `Content-Length` to match.
    pub fn sanitize(&self, headers: &mut HeaderMap, body: &[u8]) -> Bytes {
        let cleaned = self.strip(body);
        if cleaned.len() != body.len() {
            tracing::debug!(
                before = body.len(),
                after = cleaned.len(),
                "stripped auto-refresh directives"
            );
        }
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(cleaned.len()));
        Bytes::from(cleaned)
    }

    /// Drop `Refresh`-style headers from a response.
    pub fn strip_refresh_headers(headers: &mut HeaderMap) {
        for name in REFRESH_HEADERS {
            headers.remove(*name);
        }
    }
}

impl Default for ContentSanitizer {
    fn default() -> Self {
        Self::new()
    }
}
