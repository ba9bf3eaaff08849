//! HTTP client for the single upstream origin.
//!
//! # Responsibilities
//! - Map inbound URIs onto the upstream origin
//! - Issue the call with redirects disabled (the pipeline decides)
//! - Bound the call and any buffering by one deadline
//! - Classify failures into timeout / unreachable / request errors

use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, Method, Uri},
};
use futures_util::{stream, StreamExt};
use tokio::time::{self, Instant};
use url::Url;

use crate::config::UpstreamConfig;
use crate::error::{ProxyError, StartupError};

/// Result of buffering a body up to a size cap.
pub enum Buffered {
    /// The whole body fit under the cap.
    Complete(Bytes),
    /// The cap was exceeded; the body continues as a stream.
    Overflow(Body),
}

#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    base: Url,
    timeout: Duration,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, StartupError> {
        let base = Url::parse(&config.url)?;
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .no_proxy()
            .build()?;

        Ok(Self {
            client,
            base,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Deadline for a call starting now.
    pub fn deadline(&self) -> Instant {
        Instant::now() + self.timeout
    }

    /// Upstream URL for an inbound request URI, keeping path and query.
    pub fn target_url(&self, uri: &Uri) -> Url {
        let mut url = self.base.clone();
        url.set_path(uri.path());
        url.set_query(uri.query());
        url
    }

    pub async fn send(
        &self,
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Bytes,
        deadline: Instant,
    ) -> Result<reqwest::Response, ProxyError> {
        let mut request = self.client.request(method, url).headers(headers);
        if !body.is_empty() {
            request = request.body(body);
        }

        match time::timeout_at(deadline, request.send()).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(ProxyError::from_upstream(e, self.timeout)),
            Err(_) => Err(ProxyError::UpstreamTimeout(self.timeout)),
        }
    }

    /// Buffer at most `limit` bytes; larger bodies continue as a stream
    /// that replays what was already read.
    pub async fn buffer_up_to(
        &self,
        mut response: reqwest::Response,
        limit: usize,
        deadline: Instant,
    ) -> Result<Buffered, ProxyError> {
        if response
            .content_length()
            .is_some_and(|len| len > limit as u64)
        {
            return Ok(Buffered::Overflow(Body::from_stream(response.bytes_stream())));
        }

        let mut chunks: Vec<Bytes> = Vec::new();
        let mut total = 0usize;

        loop {
            let chunk = match time::timeout_at(deadline, response.chunk()).await {
                Ok(Ok(chunk)) => chunk,
                Ok(Err(e)) => return Err(ProxyError::from_upstream(e, self.timeout)),
                Err(_) => return Err(ProxyError::UpstreamTimeout(self.timeout)),
            };

            let Some(chunk) = chunk else {
                return Ok(Buffered::Complete(concat(chunks, total)));
            };

            total += chunk.len();
            chunks.push(chunk);

            if total > limit {
                let head = stream::iter(chunks.into_iter().map(Ok::<_, reqwest::Error>));
                let rest = head.chain(response.bytes_stream());
                return Ok(Buffered::Overflow(Body::from_stream(rest)));
            }
        }
    }
}

fn concat(chunks: Vec<Bytes>, total: usize) -> Bytes {
    if chunks.len() == 1 {
        return chunks.into_iter().next().unwrap_or_default();
    }
    let mut buf = Vec::with_capacity(total);
    for chunk in chunks {
        buf.extend_from_slice(&chunk);
    }
    Bytes::from(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> UpstreamClient {
        UpstreamClient::new(&UpstreamConfig {
            url: url.to_string(),
            ..UpstreamConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn target_keeps_path_and_query() {
        let upstream = client("https://origin.test");
        let uri: Uri = "/a/b?c=1&d=2".parse().unwrap();
        assert_eq!(upstream.target_url(&uri).as_str(), "https://origin.test/a/b?c=1&d=2");
    }

    #[test]
    fn target_never_changes_host() {
        let upstream = client("http://127.0.0.1:9000");
        let uri: Uri = "//evil.example/x".parse().unwrap();
        let target = upstream.target_url(&uri);
        assert_eq!(target.host_str(), Some("127.0.0.1"));
        assert_eq!(target.port(), Some(9000));
    }

    #[tokio::test]
    async fn refused_connection_is_unreachable() {
        // Port 1 is reserved and closed on test hosts.
        let upstream = client("http://127.0.0.1:1");
        let err = upstream
            .send(
                Method::GET,
                upstream.target_url(&"/".parse().unwrap()),
                HeaderMap::new(),
                Bytes::new(),
                upstream.deadline(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::UpstreamUnreachable(_)), "got {err:?}");
    }
}
