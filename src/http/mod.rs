//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, graceful shutdown)
//!     → request.rs (request ID, client identifier)
//!     → proxy::ForwardingEngine
//!     → Send to client
//!
//! GET /health → response.rs (answered locally)
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{client_identifier, MakeProxyRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
