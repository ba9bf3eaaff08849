//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-client fixed-window admission)
//!     → headers.rs (strip proxy-chain headers, overlay browser profile)
//!     → upstream
//! Upstream response:
//!     → redirect.rs (rewrite same-origin, block off-origin redirects)
//! ```
//!
//! # Design Decisions
//! - Fail closed: unreadable redirect targets are blocked
//! - No trust in client input: forwarding markers never reach upstream

pub mod headers;
pub mod rate_limit;
pub mod redirect;

pub use headers::OutboundHeaderPolicy;
pub use rate_limit::{Admission, ClientWindowTracker};
pub use redirect::{RedirectDecision, RedirectPolicy};
