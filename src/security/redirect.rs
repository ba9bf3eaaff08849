//! Upstream redirect interception.
//!
//! Redirects that stay on the upstream host are rewritten to a bare
//! `path?query` so the client comes back through the proxy. Redirects to any
//! other host are blocked and replaced by an explanatory JSON body.

use axum::http::StatusCode;
use url::Url;

/// What to do with an upstream response's `Location`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectDecision {
    /// Not a redirect, or a redirect without `Location`.
    PassThrough,
    /// Same-origin redirect; `Location` becomes this path.
    Rewritten(String),
    /// Off-origin redirect carrying the original location.
    Blocked(String),
}

impl RedirectDecision {
    pub fn label(&self) -> &'static str {
        match self {
            RedirectDecision::PassThrough => "pass_through",
            RedirectDecision::Rewritten(_) => "rewritten",
            RedirectDecision::Blocked(_) => "blocked",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RedirectPolicy {
    upstream_host: String,
}

impl RedirectPolicy {
    pub fn new(upstream: &Url) -> Self {
        Self {
            upstream_host: upstream.host_str().unwrap_or_default().to_ascii_lowercase(),
        }
    }

    /// Decide how to treat `location` on a response with `status`.
    ///
    /// `request_url` is the upstream URL the response answered; relative
    /// references without a leading slash are resolved against it.
    pub fn evaluate(
        &self,
        status: StatusCode,
        location: Option<&str>,
        request_url: &Url,
    ) -> RedirectDecision {
        if !status.is_redirection() {
            return RedirectDecision::PassThrough;
        }
        let Some(location) = location else {
            return RedirectDecision::PassThrough;
        };

        // Browsers drop tabs and newlines inside URLs before resolving them.
        let cleaned: String = location
            .chars()
            .filter(|c| !matches!(c, '\t' | '\n' | '\r'))
            .collect();

        if cleaned.starts_with('/') {
            if is_network_path(&cleaned) {
                return RedirectDecision::Blocked(location.to_string());
            }
            return RedirectDecision::Rewritten(location.to_string());
        }

        let resolved = match Url::parse(&cleaned) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => match request_url.join(&cleaned) {
                Ok(url) => url,
                Err(_) => return RedirectDecision::Blocked(location.to_string()),
            },
            Err(_) => return RedirectDecision::Blocked(location.to_string()),
        };

        let same_host = resolved
            .host_str()
            .map(|h| h.eq_ignore_ascii_case(&self.upstream_host))
            .unwrap_or(false);

        if same_host
            && matches!(resolved.scheme(), "http" | "https")
            && !is_network_path(resolved.path())
        {
            let mut path = resolved.path().to_string();
            if let Some(query) = resolved.query() {
                path.push('?');
                path.push_str(query);
            }
            RedirectDecision::Rewritten(path)
        } else {
            RedirectDecision::Blocked(location.to_string())
        }
    }
}

/// `//host` and `/\host` both name another authority to a browser.
fn is_network_path(path: &str) -> bool {
    let mut chars = path.chars();
    chars.next() == Some('/') && matches!(chars.next(), Some('/' | '\\'))
}
