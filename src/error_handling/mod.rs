//! Error handling.
//!
//! This module provides:
//! - Initialization error types
//! - Proxy list parse errors
//! - The structured failure value returned by a logical fetch
//! - Categorization of transport-level `reqwest` errors

mod categorization;
mod types;

// Re-export public API
pub use categorization::{classify_transport_error, describe_transport_error};
pub use types::{FailureKind, FetchError, InitializationError, ProxyParseError};
