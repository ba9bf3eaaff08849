//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the health and proxy handlers
//! - Wire up middleware (request ID, tracing, CORS, body limit)
//! - Bind server to listener
//! - Resolve the client identifier and hand requests to the engine
//! - Run the housekeeper alongside the server until shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::Response,
    routing::{any, get},
    Json, Router,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::SetRequestIdLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::error::StartupError;
use crate::http::request::{client_identifier, request_id, MakeProxyRequestId};
use crate::http::response::HealthStatus;
use crate::lifecycle::{Housekeeper, ShutdownSignal};
use crate::proxy::ForwardingEngine;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ForwardingEngine>,
    pub target: String,
    pub trust_forwarded_for: bool,
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    engine: Arc<ForwardingEngine>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, StartupError> {
        let engine = Arc::new(ForwardingEngine::from_config(&config)?);

        tracing::info!(
            upstream = %engine.upstream_url(),
            rate_limit = config.rate_limit.enabled,
            cache = config.cache.enabled,
            sanitizer = config.sanitizer.enabled,
            header_mode = ?config.headers.mode,
            "Forwarding engine ready"
        );

        let state = AppState {
            engine: engine.clone(),
            target: config.upstream.url.clone(),
            trust_forwarded_for: config.rate_limit.trust_forwarded_for,
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            engine,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler).fallback(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(CorsLayer::permissive())
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        request_id = %request_id(request.headers()),
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                }),
            )
            .layer(SetRequestIdLayer::x_request_id(MakeProxyRequestId))
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires and in-flight requests drain.
    pub async fn run(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.engine.upstream_url(),
            "HTTP server starting"
        );

        let housekeeper = Housekeeper::new(
            self.engine.tracker().cloned(),
            self.engine.cache().cloned(),
            Duration::from_secs(self.config.maintenance.sweep_interval_secs),
        );
        let housekeeping = tokio::spawn(housekeeper.run(shutdown.clone()));

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        let mut signal = shutdown;
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move { signal.recv().await })
            .await;

        housekeeping.abort();
        served?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The assembled router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus::ok(&state.target, chrono::Utc::now()))
}

/// Main proxy handler: identify the client and run the pipeline.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let client = client_identifier(request.headers(), peer, state.trust_forwarded_for);
    state.engine.handle(&client, request).await
}
