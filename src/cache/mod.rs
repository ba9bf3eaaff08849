//! Response caching subsystem.
//!
//! # Data Flow
//! ```text
//! GET request
//!     → cache_key (method + path + query)
//!     → ResponseCache::lookup (fresh entry → replay, no upstream call)
//!     → miss → upstream → 200 with non-empty body → ResponseCache::store
//! ```
//!
//! # Design Decisions
//! - Concurrent map (DashMap) shared through Arc
//! - Stale rows are ignored on lookup and dropped by the housekeeper
//! - Bounded: a full cache evicts the oldest entry before inserting

pub mod response_cache;

pub use response_cache::{cache_key, CachedResponse, ResponseCache};
