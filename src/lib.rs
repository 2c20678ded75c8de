//! adaptive_fetch library: policy-driven HTTP retrieval
//!
//! This library fetches pages the way a patient human would: every attempt uses a
//! rotated browser identity, an optional proxy chosen by observed health, and a
//! randomized human-cadence delay with periodic session breaks. Responses are
//! classified (OK, blocked, rate limited, transient, permanent) and failed attempts
//! are retried with exponential backoff. Bodies are handed back untouched for a
//! separate extraction step.
//!
//! # Example
//!
//! ```no_run
//! use adaptive_fetch::{FetchConfig, FetchOrchestrator, FailureKind};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let orchestrator = FetchOrchestrator::new(FetchConfig {
//!     use_proxies: false,
//!     ..Default::default()
//! });
//!
//! match orchestrator.fetch("https://example.com/search?page=1").await {
//!     Ok(response) => println!("{} -> {} bytes", response.status, response.body.len()),
//!     Err(e) if e.kind == FailureKind::Blocked => eprintln!("blocked: {e}"),
//!     Err(e) => eprintln!("failed: {e}"),
//! }
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

#![warn(missing_docs)]

mod app;
pub mod classify;
pub mod config;
pub mod error_handling;
pub mod fetch;
pub mod identity;
pub mod initialization;
pub mod pacing;
pub mod proxy;

// Re-export public API
pub use app::{format_summary, normalize_target_url, RunSummary};
pub use classify::{Classification, ResponseClassifier};
pub use config::{Cli, FetchConfig, IdentitySelection, LogFormat, LogLevel};
pub use error_handling::{FailureKind, FetchError, InitializationError, ProxyParseError};
pub use fetch::{FetchOptions, FetchOrchestrator, FetchResponse, OrchestratorStats, ProxySelection};
pub use identity::{Identity, IdentityPool};
pub use pacing::{PacingConfig, RatePacer, SlotGrant};
pub use proxy::{Proxy, ProxyOutcome, ProxyProtocol, ProxyRegistry, ProxyStats, ProxyStatus};
pub use run::{run_fetch, RunReport};

// Internal run module (sequential CLI fetch loop)
mod run {
    use anyhow::{bail, Context, Result};
    use log::{info, warn};

    use crate::app::{
        cancel_on_ctrl_c, normalize_targets, print_fetch_statistics, read_url_file, save_body,
        RunSummary,
    };
    use crate::config::Cli;
    use crate::error_handling::InitializationError;
    use crate::fetch::{FetchOptions, FetchOrchestrator};
    use crate::initialization::{build_client, ClientSettings};
    use crate::proxy::load_proxy_file;

    /// Results of a CLI fetch run.
    #[derive(Debug, Clone)]
    pub struct RunReport {
        /// Per-outcome URL counts
        pub summary: RunSummary,
        /// Elapsed time in seconds
        pub elapsed_seconds: f64,
    }

    /// Fetches every URL named on the command line, one after another.
    ///
    /// URLs come from the positional arguments followed by `--url-file`. Proxies
    /// from `--proxy-file` are loaded into the orchestrator's registry. Each URL
    /// gets one log line with its outcome; bodies are written to `--output-dir`
    /// when set. A Ctrl-C cancels the fetch in flight and skips the remaining URLs.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The URL or proxy file cannot be read
    /// - No valid URL was given
    /// - The HTTP client cannot be built
    pub async fn run_fetch(cli: Cli) -> Result<RunReport> {
        let config = cli.to_fetch_config();

        let mut urls = normalize_targets(cli.urls.iter().map(String::as_str));
        if let Some(path) = &cli.url_file {
            urls.extend(read_url_file(path).await?);
        }
        if urls.is_empty() {
            bail!("No valid URLs to fetch (pass URLs as arguments or use --url-file)");
        }
        info!("Fetching {} URL(s)", urls.len());

        // Surface TLS backend or builder problems before the first pacing wait
        build_client(&ClientSettings::from(&config), None)
            .map_err(InitializationError::from)
            .context("Failed to initialize HTTP client")?;

        let orchestrator = FetchOrchestrator::new(config);
        if let Some(path) = &cli.proxy_file {
            let proxies = load_proxy_file(path).await?;
            orchestrator.registry().add(proxies);
        }

        let cancel = cancel_on_ctrl_c();
        let start_time = std::time::Instant::now();
        let mut summary = RunSummary {
            total_urls: urls.len(),
            ..Default::default()
        };

        for (index, url) in urls.iter().enumerate() {
            if cancel.is_cancelled() {
                summary.skipped = urls.len() - index;
                warn!("Skipping {} remaining URL(s) after interrupt", summary.skipped);
                break;
            }

            let mut options = FetchOptions::default().with_cancel_token(cancel.clone());
            if let Some(deadline) = cli.deadline() {
                options = options.with_timeout(deadline);
            }

            match orchestrator.fetch_with(url, options).await {
                Ok(response) => {
                    summary.successful += 1;
                    info!(
                        "✅ {} {} ({} bytes, {} attempt(s), via {})",
                        response.status,
                        url,
                        response.body.len(),
                        response.attempts,
                        response.proxy.as_deref().unwrap_or("direct")
                    );
                    if let Some(dir) = &cli.output_dir {
                        match save_body(dir, index + 1, &response).await {
                            Ok(path) => info!("   saved {}", path.display()),
                            Err(e) => warn!("   {e:#}"),
                        }
                    }
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!("❌ {e}");
                }
            }
        }

        let elapsed_seconds = start_time.elapsed().as_secs_f64();
        let stats = orchestrator.stats().await;
        let proxy_stats = orchestrator.registry().stats();
        print_fetch_statistics(&stats, Some(&proxy_stats));

        Ok(RunReport {
            summary,
            elapsed_seconds,
        })
    }
}
