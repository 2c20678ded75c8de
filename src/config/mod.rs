//! Application configuration and constants.
//!
//! This module provides:
//! - Default constants (retry, pacing, proxy health, timeouts, signatures)
//! - The library configuration object
//! - Logging option types shared with the CLI
//! - Command-line option parsing

mod cli;
mod constants;
mod types;

// Re-export all constants
pub use cli::Cli;
pub use constants::*;
pub use types::{FetchConfig, IdentitySelection, LogFormat, LogLevel};
