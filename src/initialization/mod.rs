//! Resource initialization.
//!
//! This module provides functions to initialize shared resources:
//! - Logger (plain or JSON)
//! - HTTP clients, one per route, cached
//!
//! All initialization functions return proper error types for error handling.

mod client;
mod logger;

// Re-export public API
pub use client::{build_client, ClientCache, ClientSettings};
pub use logger::init_logger_with;
