//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → server stops accepting → in-flight requests drain → exit 0
//!
//! Housekeeping (housekeeping.rs):
//!     interval tick → sweep expired windows and cache entries
//! ```

pub mod housekeeping;
pub mod shutdown;
pub mod signals;

pub use housekeeping::Housekeeper;
pub use shutdown::{Shutdown, ShutdownSignal};
