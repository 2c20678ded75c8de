//! Configuration types.
//!
//! This module defines the library configuration object ([`FetchConfig`]) and the
//! enums shared between the library and the command-line interface.

use std::time::Duration;

use clap::ValueEnum;
use log::warn;

use crate::config::constants::*;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// How the identity pool picks the next identity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum IdentitySelection {
    /// Cycle through identities in order, starting at a random offset
    #[default]
    RoundRobin,
    /// Uniform random pick, never repeating the previous identity
    Random,
}

/// Configuration for a [`FetchOrchestrator`](crate::FetchOrchestrator).
///
/// All knobs of the retrieval layer live here with documented defaults; nothing
/// is hidden in module-level constants that callers cannot change.
///
/// # Examples
///
/// ```no_run
/// use adaptive_fetch::FetchConfig;
/// use std::time::Duration;
///
/// let config = FetchConfig {
///     max_retries: 5,
///     min_delay: Duration::from_millis(500),
///     max_delay: Duration::from_millis(1500),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Maximum attempts per logical fetch (default: 3)
    pub max_retries: u32,

    /// Base delay for exponential backoff (default: 1000ms)
    pub backoff_base_delay: Duration,

    /// Ceiling for a single backoff wait (default: 60s)
    pub backoff_max_delay: Duration,

    /// Additional multiplier for backoff after a rate-limited attempt (default: 2.0)
    pub rate_limit_backoff_multiplier: f64,

    /// Lower bound of the randomized delay between requests (default: 3000ms)
    pub min_delay: Duration,

    /// Upper bound of the randomized delay between requests (default: 5000ms)
    pub max_delay: Duration,

    /// Requests per session before a session break (default: 2)
    pub max_pages_per_session: u32,

    /// Length of the pause between sessions (default: 600000ms)
    pub session_break_duration: Duration,

    /// Enable human-cadence pacing (delays and session breaks)
    pub pacing_enabled: bool,

    /// Route requests through the proxy registry
    pub use_proxies: bool,

    /// Fall back to a direct request when no proxy is available
    pub direct_fallback: bool,

    /// Consecutive failures before a proxy is marked failed (default: 3)
    pub proxy_failure_threshold: u32,

    /// Optional cooldown after which a failed proxy is selectable again
    pub proxy_cooldown: Option<Duration>,

    /// Per-attempt HTTP timeout (default: 30s)
    pub request_timeout: Duration,

    /// TCP connect timeout (default: 10s)
    pub connect_timeout: Duration,

    /// Response bodies are truncated to this many bytes (default: 5MB)
    pub max_body_bytes: usize,

    /// Body phrases classified as a block
    pub block_signatures: Vec<String>,

    /// Body phrases classified as rate limiting
    pub rate_limit_signatures: Vec<String>,

    /// Status codes classified as transient errors
    pub transient_statuses: Vec<u16>,

    /// Candidate user-agent strings (empty = built-in browser profiles)
    pub user_agents: Vec<String>,

    /// Identity selection policy
    pub identity_selection: IdentitySelection,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base_delay: DEFAULT_BACKOFF_BASE_DELAY,
            backoff_max_delay: DEFAULT_BACKOFF_MAX_DELAY,
            rate_limit_backoff_multiplier: DEFAULT_RATE_LIMIT_BACKOFF_MULTIPLIER,
            min_delay: DEFAULT_MIN_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            max_pages_per_session: DEFAULT_MAX_PAGES_PER_SESSION,
            session_break_duration: DEFAULT_SESSION_BREAK_DURATION,
            pacing_enabled: true,
            use_proxies: true,
            direct_fallback: true,
            proxy_failure_threshold: DEFAULT_PROXY_FAILURE_THRESHOLD,
            proxy_cooldown: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(TCP_CONNECT_TIMEOUT_SECS),
            max_body_bytes: MAX_RESPONSE_BODY_SIZE,
            block_signatures: DEFAULT_BLOCK_SIGNATURES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            rate_limit_signatures: DEFAULT_RATE_LIMIT_SIGNATURES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            transient_statuses: DEFAULT_TRANSIENT_STATUSES.to_vec(),
            user_agents: Vec::new(),
            identity_selection: IdentitySelection::default(),
        }
    }
}

impl FetchConfig {
    /// Normalizes inconsistent values, logging a warning for each correction.
    pub fn validate(mut self) -> Self {
        if self.max_retries == 0 {
            warn!("max_retries of 0 would never issue a request, using 1");
            self.max_retries = 1;
        }
        if self.min_delay > self.max_delay {
            warn!(
                "min_delay {:?} exceeds max_delay {:?}, swapping",
                self.min_delay, self.max_delay
            );
            std::mem::swap(&mut self.min_delay, &mut self.max_delay);
        }
        if self.max_pages_per_session == 0 {
            warn!("max_pages_per_session of 0 is not meaningful, using 1");
            self.max_pages_per_session = 1;
        }
        if self.proxy_failure_threshold == 0 {
            warn!("proxy_failure_threshold of 0 is not meaningful, using 1");
            self.proxy_failure_threshold = 1;
        }
        if !self.rate_limit_backoff_multiplier.is_finite() || self.rate_limit_backoff_multiplier < 1.0
        {
            warn!(
                "rate_limit_backoff_multiplier {} is below 1.0, using 1.0",
                self.rate_limit_backoff_multiplier
            );
            self.rate_limit_backoff_multiplier = 1.0;
        }
        if self.backoff_max_delay < self.backoff_base_delay {
            warn!(
                "backoff_max_delay {:?} is below backoff_base_delay {:?}, raising it",
                self.backoff_max_delay, self.backoff_base_delay
            );
            self.backoff_max_delay = self.backoff_base_delay;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(
            log::LevelFilter::from(LogLevel::Error),
            log::LevelFilter::Error
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Warn),
            log::LevelFilter::Warn
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Info),
            log::LevelFilter::Info
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Debug),
            log::LevelFilter::Debug
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Trace),
            log::LevelFilter::Trace
        );
    }

    #[test]
    fn test_log_format_debug() {
        assert_eq!(format!("{:?}", LogFormat::Plain), "Plain");
        assert_eq!(format!("{:?}", LogFormat::Json), "Json");
    }

    #[test]
    fn test_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.backoff_base_delay, Duration::from_millis(1000));
        assert_eq!(config.min_delay, Duration::from_millis(3000));
        assert_eq!(config.max_delay, Duration::from_millis(5000));
        assert_eq!(config.max_pages_per_session, 2);
        assert_eq!(config.session_break_duration, Duration::from_millis(600_000));
        assert_eq!(config.proxy_failure_threshold, 3);
        assert!(config.use_proxies);
        assert!(config.direct_fallback);
        assert!(config.proxy_cooldown.is_none());
        assert!(config.block_signatures.iter().any(|s| s == "captcha"));
        assert_eq!(config.transient_statuses, vec![500, 502, 503, 504]);
    }

    #[test]
    fn test_validate_swaps_inverted_delays() {
        let config = FetchConfig {
            min_delay: Duration::from_millis(900),
            max_delay: Duration::from_millis(100),
            ..Default::default()
        }
        .validate();
        assert_eq!(config.min_delay, Duration::from_millis(100));
        assert_eq!(config.max_delay, Duration::from_millis(900));
    }

    #[test]
    fn test_validate_fixes_zero_values() {
        let config = FetchConfig {
            max_retries: 0,
            max_pages_per_session: 0,
            proxy_failure_threshold: 0,
            rate_limit_backoff_multiplier: 0.5,
            ..Default::default()
        }
        .validate();
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.max_pages_per_session, 1);
        assert_eq!(config.proxy_failure_threshold, 1);
        assert_eq!(config.rate_limit_backoff_multiplier, 1.0);
    }

    #[test]
    fn test_validate_keeps_sane_config() {
        let config = FetchConfig::default().validate();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.min_delay, Duration::from_millis(3000));
    }
}
