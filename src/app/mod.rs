//! Command-line application helpers.
//!
//! This module provides utilities for URL normalization, Ctrl-C handling, body
//! output and statistics printing used by the binary.

pub mod output;
pub mod shutdown;
pub mod statistics;
pub mod url;

// Re-export public API
pub use output::{body_file_name, save_body};
pub use shutdown::cancel_on_ctrl_c;
pub use statistics::{format_summary, print_fetch_statistics, RunSummary};
pub use url::{normalize_target_url, normalize_targets, read_url_file};
