//! Forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! http::server (client id resolved)
//!     → engine.rs (admission, cache, redirects, sanitizing)
//!     → upstream.rs (reqwest call bounded by one deadline)
//!     → upstream origin
//! ```

pub mod engine;
pub mod upstream;

pub use engine::ForwardingEngine;
pub use upstream::UpstreamClient;
