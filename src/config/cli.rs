//! Command-line options.
//!
//! Every option can also be supplied through an `ADAPTIVE_FETCH_*` environment
//! variable (a `.env` file is loaded first by the binary).

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use super::constants::*;
use super::types::{FetchConfig, IdentitySelection, LogFormat, LogLevel};

/// Command-line options for the `adaptive_fetch` binary.
///
/// # Examples
///
/// ```bash
/// # Fetch two pages with default human pacing
/// adaptive_fetch "https://example.com/search?page=1" "https://example.com/search?page=2"
///
/// # Through a proxy list, saving bodies
/// adaptive_fetch --url-file pages.txt --proxy-file proxies.txt --output-dir ./pages
///
/// # Fast, unpaced run for testing
/// adaptive_fetch example.com --no-pacing --max-retries 1
/// ```
#[derive(Debug, Parser)]
#[command(
    name = "adaptive_fetch",
    about = "Fetches pages sequentially with rotating identities, proxy health tracking and human-paced retries."
)]
pub struct Cli {
    /// URLs to fetch (scheme optional, https assumed)
    #[arg(value_parser)]
    pub urls: Vec<String>,

    /// File with one URL per line (blank lines and # comments ignored)
    #[arg(long, env = "ADAPTIVE_FETCH_URL_FILE")]
    pub url_file: Option<PathBuf>,

    /// Proxy list: host:port or host:port:user:pass per line, optional scheme prefix
    #[arg(long, env = "ADAPTIVE_FETCH_PROXY_FILE")]
    pub proxy_file: Option<PathBuf>,

    /// Directory to write fetched bodies into
    #[arg(long, env = "ADAPTIVE_FETCH_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Maximum attempts per URL
    #[arg(long, env = "ADAPTIVE_FETCH_MAX_RETRIES", default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    /// Base backoff delay in milliseconds (waits are base * 2^attempt)
    #[arg(long, env = "ADAPTIVE_FETCH_BACKOFF_BASE_MS", default_value_t = 1000)]
    pub backoff_base_ms: u64,

    /// Ceiling for one backoff wait in milliseconds
    #[arg(long, env = "ADAPTIVE_FETCH_BACKOFF_MAX_MS", default_value_t = 60_000)]
    pub backoff_max_ms: u64,

    /// Minimum delay between requests in milliseconds
    #[arg(long, env = "ADAPTIVE_FETCH_MIN_DELAY_MS", default_value_t = 3000)]
    pub min_delay_ms: u64,

    /// Maximum delay between requests in milliseconds
    #[arg(long, env = "ADAPTIVE_FETCH_MAX_DELAY_MS", default_value_t = 5000)]
    pub max_delay_ms: u64,

    /// Requests per session before a session break
    #[arg(long, env = "ADAPTIVE_FETCH_MAX_PAGES_PER_SESSION", default_value_t = DEFAULT_MAX_PAGES_PER_SESSION)]
    pub max_pages_per_session: u32,

    /// Session break length in milliseconds
    #[arg(long, env = "ADAPTIVE_FETCH_SESSION_BREAK_MS", default_value_t = 600_000)]
    pub session_break_ms: u64,

    /// Disable inter-request delays and session breaks
    #[arg(long, env = "ADAPTIVE_FETCH_NO_PACING")]
    pub no_pacing: bool,

    /// Fail instead of going direct when no proxy is active
    #[arg(long, env = "ADAPTIVE_FETCH_NO_DIRECT_FALLBACK")]
    pub no_direct_fallback: bool,

    /// Consecutive failures before a proxy is marked failed
    #[arg(long, env = "ADAPTIVE_FETCH_PROXY_FAILURE_THRESHOLD", default_value_t = DEFAULT_PROXY_FAILURE_THRESHOLD)]
    pub proxy_failure_threshold: u32,

    /// Seconds after which a failed proxy is tried again (default: never)
    #[arg(long, env = "ADAPTIVE_FETCH_PROXY_COOLDOWN_SECS")]
    pub proxy_cooldown_secs: Option<u64>,

    /// Per-attempt HTTP timeout in seconds
    #[arg(long, env = "ADAPTIVE_FETCH_TIMEOUT_SECONDS", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub timeout_seconds: u64,

    /// Overall deadline per URL in seconds, pacing and backoff included
    #[arg(long, env = "ADAPTIVE_FETCH_DEADLINE_SECONDS")]
    pub deadline_seconds: Option<u64>,

    /// Candidate User-Agent (repeatable; default: built-in browser profiles)
    #[arg(long = "user-agent")]
    pub user_agents: Vec<String>,

    /// Identity rotation policy
    #[arg(long, value_enum, default_value_t = IdentitySelection::RoundRobin)]
    pub identity_selection: IdentitySelection,

    /// Extra body phrase classified as a block (repeatable, added to the defaults)
    #[arg(long = "block-signature")]
    pub block_signatures: Vec<String>,
}

impl Cli {
    /// Builds the library configuration from the parsed options.
    pub fn to_fetch_config(&self) -> FetchConfig {
        let defaults = FetchConfig::default();
        let mut block_signatures = defaults.block_signatures.clone();
        block_signatures.extend(self.block_signatures.iter().cloned());

        FetchConfig {
            max_retries: self.max_retries,
            backoff_base_delay: Duration::from_millis(self.backoff_base_ms),
            backoff_max_delay: Duration::from_millis(self.backoff_max_ms),
            min_delay: Duration::from_millis(self.min_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            max_pages_per_session: self.max_pages_per_session,
            session_break_duration: Duration::from_millis(self.session_break_ms),
            pacing_enabled: !self.no_pacing,
            use_proxies: self.proxy_file.is_some(),
            direct_fallback: !self.no_direct_fallback,
            proxy_failure_threshold: self.proxy_failure_threshold,
            proxy_cooldown: self.proxy_cooldown_secs.map(Duration::from_secs),
            request_timeout: Duration::from_secs(self.timeout_seconds),
            block_signatures,
            user_agents: self.user_agents.clone(),
            identity_selection: self.identity_selection,
            ..defaults
        }
    }

    /// Per-URL deadline, if set.
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_seconds.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_library_defaults() {
        let cli = Cli::parse_from(["adaptive_fetch", "example.com"]);
        let config = cli.to_fetch_config();
        let defaults = FetchConfig::default();
        assert_eq!(cli.urls, vec!["example.com".to_string()]);
        assert_eq!(config.max_retries, defaults.max_retries);
        assert_eq!(config.backoff_base_delay, defaults.backoff_base_delay);
        assert_eq!(config.backoff_max_delay, defaults.backoff_max_delay);
        assert_eq!(config.min_delay, defaults.min_delay);
        assert_eq!(config.max_delay, defaults.max_delay);
        assert_eq!(config.max_pages_per_session, defaults.max_pages_per_session);
        assert_eq!(config.session_break_duration, defaults.session_break_duration);
        assert_eq!(config.request_timeout, defaults.request_timeout);
        assert!(config.pacing_enabled);
        assert!(!config.use_proxies);
        assert!(config.direct_fallback);
        assert!(cli.deadline().is_none());
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::parse_from([
            "adaptive_fetch",
            "--url-file",
            "pages.txt",
            "--proxy-file",
            "proxies.txt",
            "--no-pacing",
            "--no-direct-fallback",
            "--max-retries",
            "5",
            "--proxy-cooldown-secs",
            "120",
            "--deadline-seconds",
            "90",
            "--user-agent",
            "UA-1",
            "--user-agent",
            "UA-2",
            "--block-signature",
            "verify you are human",
            "--identity-selection",
            "random",
        ]);
        let config = cli.to_fetch_config();
        assert!(cli.urls.is_empty());
        assert_eq!(config.max_retries, 5);
        assert!(!config.pacing_enabled);
        assert!(config.use_proxies);
        assert!(!config.direct_fallback);
        assert_eq!(config.proxy_cooldown, Some(Duration::from_secs(120)));
        assert_eq!(config.user_agents, vec!["UA-1".to_string(), "UA-2".to_string()]);
        assert_eq!(config.identity_selection, IdentitySelection::Random);
        assert!(config.block_signatures.iter().any(|s| s == "captcha"));
        assert!(config
            .block_signatures
            .iter()
            .any(|s| s == "verify you are human"));
        assert_eq!(cli.deadline(), Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
