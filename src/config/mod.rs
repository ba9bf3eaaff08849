//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional TOML file (PROXY_CONFIG)
//!     → loader.rs (parse & deserialize)
//!     → environment overrides (PORT, UPSTREAM_URL, ...)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the upstream is fixed per deployment
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::ConfigError;
pub use schema::{
    CacheConfig, HeaderMode, HeaderPolicyConfig, ListenerConfig, LogFormat, ProxyConfig,
    RateLimitConfig, SanitizerConfig, UpstreamConfig,
};
