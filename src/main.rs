//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `adaptive_fetch` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use adaptive_fetch::initialization::init_logger_with;
use adaptive_fetch::{format_summary, run_fetch, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists)
    // Try loading from current directory first, then from the executable's directory
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let cli = Cli::parse();

    let log_level = cli.log_level.clone();
    let log_format = cli.log_format.clone();
    init_logger_with(log_level.into(), log_format).context("Failed to initialize logger")?;

    match run_fetch(cli).await {
        Ok(report) => {
            let elapsed = Duration::from_secs_f64(report.elapsed_seconds);
            println!("{}", format_summary(&report.summary, elapsed));
            Ok(())
        }
        Err(e) => {
            eprintln!("adaptive_fetch error: {:#}", e);
            process::exit(1);
        }
    }
}
