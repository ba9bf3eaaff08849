//! Response body transformation.
//!
//! Only HTML bodies are buffered and rewritten; every other content type
//! streams through untouched.

pub mod sanitizer;

pub use sanitizer::ContentSanitizer;
