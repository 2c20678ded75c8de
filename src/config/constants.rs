//! Configuration constants.
//!
//! This module defines the documented defaults used by [`FetchConfig`](super::FetchConfig)
//! and the CLI. Every value here can be overridden at construction time.

use std::time::Duration;

// Retry strategy
/// Maximum attempts for one logical fetch (initial attempt included)
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Base delay for exponential backoff (`base * 2^attempt`)
pub const DEFAULT_BACKOFF_BASE_DELAY: Duration = Duration::from_millis(1000);
/// Ceiling for any single backoff wait
pub const DEFAULT_BACKOFF_MAX_DELAY: Duration = Duration::from_secs(60);
/// Extra multiplier applied to the backoff after a RATE_LIMITED attempt
pub const DEFAULT_RATE_LIMIT_BACKOFF_MULTIPLIER: f64 = 2.0;

// Pacing
/// Lower bound of the randomized inter-request delay
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(3000);
/// Upper bound of the randomized inter-request delay
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(5000);
/// Requests allowed in one browsing session before a session break
pub const DEFAULT_MAX_PAGES_PER_SESSION: u32 = 2;
/// Pause enforced between two sessions (10 minutes)
pub const DEFAULT_SESSION_BREAK_DURATION: Duration = Duration::from_millis(600_000);

// Proxy health
/// Consecutive failures after which a proxy is marked failed
pub const DEFAULT_PROXY_FAILURE_THRESHOLD: u32 = 3;

// Network operation timeouts
/// Per-attempt HTTP timeout in seconds (covers connect, send and body read)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
/// TCP connection timeout in seconds
pub const TCP_CONNECT_TIMEOUT_SECS: u64 = 10;

// Response size limits
/// Maximum response body size in bytes (5MB)
/// Larger bodies are truncated before classification
pub const MAX_RESPONSE_BODY_SIZE: usize = 5 * 1024 * 1024;

/// Redirect hops followed by the HTTP client before giving up
pub const MAX_REDIRECT_HOPS: usize = 10;

// Session statistics
/// Sliding window used for the `recent_requests` counter
pub const RECENT_REQUESTS_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Maximum URL length accepted from CLI input
pub const MAX_URL_LENGTH: usize = 2048;

/// Body phrases (matched case-insensitively) that mark a soft block.
pub const DEFAULT_BLOCK_SIGNATURES: &[&str] = &[
    "captcha",
    "access denied",
    "blocked",
    "cloudflare",
    "ddos protection",
    "are you a robot",
    "unusual traffic",
    "too many requests",
    "rate limit",
];

/// Body phrases (matched case-insensitively) that mark rate limiting instead of a block.
/// Empty by default: every default signature, rate-limit wording included, reads as a block.
pub const DEFAULT_RATE_LIMIT_SIGNATURES: &[&str] = &[];

/// Status codes that are worth retrying unchanged.
pub const DEFAULT_TRANSIENT_STATUSES: &[u16] = &[500, 502, 503, 504];

// HTTP status codes (for clarity and consistency)
/// 200
pub const HTTP_STATUS_OK: u16 = 200;
/// 403
pub const HTTP_STATUS_FORBIDDEN: u16 = 403;
/// 429
pub const HTTP_STATUS_TOO_MANY_REQUESTS: u16 = 429;
