//! Origin shield proxy binary.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────▶ http::server ──▶ proxy::engine ──────────────────────▶ Upstream
//!                 (request id,      │ security::rate_limit (admission)     origin
//!                  CORS, tracing)   │ cache (GET replay)
//!                                   │ security::headers (outbound profile)
//!                                   │ proxy::upstream (deadline)
//!                                   │ security::redirect (contain)
//!                                   │ transform::sanitizer (HTML)
//!     Client Response ◀─────────────┘
//!
//!     Cross-cutting: config, observability, lifecycle (signals, housekeeping)
//! ```

use tokio::net::TcpListener;

use origin_shield::config::loader;
use origin_shield::http::HttpServer;
use origin_shield::lifecycle::{signals, Shutdown};
use origin_shield::observability::{logging, metrics};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match loader::load_from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("origin-shield: {e}");
            std::process::exit(1);
        }
    };

    logging::init(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "origin-shield starting");
    tracing::info!(
        bind_address = %config.listener.bind_address(),
        upstream = %config.upstream.url,
        upstream_timeout_secs = config.upstream.timeout_secs,
        rate_limit_max = config.rate_limit.max_requests,
        rate_limit_window_secs = config.rate_limit.window_secs,
        cache_ttl_secs = config.cache.ttl_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(config.listener.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_listener(shutdown.clone());

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
