//! Error type definitions.
//!
//! This module defines the initialization errors, the proxy list parse errors, and
//! the structured failure value returned by a logical fetch.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use serde::Serialize;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

use crate::classify::Classification;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),
}

/// Errors produced while parsing a proxy list line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProxyParseError {
    /// Wrong number of `:`-separated fields.
    #[error("line {line}: expected host:port or host:port:username:password, got {input:?}")]
    Malformed {
        /// 1-based line number
        line: usize,
        /// The offending line, trimmed
        input: String,
    },

    /// Host field was empty.
    #[error("line {line}: empty host")]
    EmptyHost {
        /// 1-based line number
        line: usize,
    },

    /// Host that cannot form a proxy URL (whitespace, bad characters).
    #[error("line {line}: invalid proxy host {host:?}")]
    InvalidHost {
        /// 1-based line number
        line: usize,
        /// Host as written
        host: String,
    },

    /// Port was not a number in 1..=65535.
    #[error("line {line}: invalid port {port:?}")]
    InvalidPort {
        /// 1-based line number
        line: usize,
        /// Port as written
        port: String,
    },

    /// Scheme prefix other than http, https or socks5.
    #[error("line {line}: unsupported proxy scheme {scheme:?}")]
    UnsupportedScheme {
        /// 1-based line number
        line: usize,
        /// Scheme as written
        scheme: String,
    },
}

/// Kind of terminal failure for one logical fetch.
///
/// Callers branch on this to decide whether to skip a page, abandon a job, or
/// escalate to a heavier retrieval strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// Caller-imposed deadline exceeded or fetch cancelled
    Timeout,
    /// Anti-automation signature or 403 on the last attempt
    Blocked,
    /// 429 or rate-limit signature on the last attempt
    RateLimited,
    /// Non-retryable response (404 and friends) or invalid request
    Permanent,
    /// DNS, connect, socket timeout or transient server errors until exhaustion
    Network,
}

impl FailureKind {
    /// Lowercase label used in logs and summaries.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::Blocked => "blocked",
            FailureKind::RateLimited => "rate limited",
            FailureKind::Permanent => "permanent error",
            FailureKind::Network => "network error",
        }
    }

    /// Maps the classification of the last attempt to the failure surfaced to callers.
    ///
    /// `Ok` never produces a failure; it maps to `Permanent` only so the function
    /// stays total.
    pub fn from_classification(classification: Classification) -> Self {
        match classification {
            Classification::Blocked => FailureKind::Blocked,
            Classification::RateLimited => FailureKind::RateLimited,
            Classification::TransientError => FailureKind::Network,
            Classification::PermanentError | Classification::Ok => FailureKind::Permanent,
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failure of a logical fetch.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{kind} fetching {url} after {attempts} attempt(s){}", status_suffix(.last_status))]
pub struct FetchError {
    /// What kind of failure ended the fetch
    pub kind: FailureKind,
    /// Status code of the last response, if any response was received
    pub last_status: Option<u16>,
    /// Attempts actually issued
    pub attempts: u32,
    /// Target URL as requested
    pub url: String,
    /// Detail from the last attempt (transport error text, matched signature, ...)
    pub message: Option<String>,
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (last status {code})"),
        None => String::new(),
    }
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, url: &str, attempts: u32) -> Self {
        Self {
            kind,
            last_status: None,
            attempts,
            url: url.to_string(),
            message: None,
        }
    }

    pub(crate) fn with_status(mut self, status: Option<u16>) -> Self {
        self.last_status = status;
        self
    }

    pub(crate) fn with_message(mut self, message: Option<String>) -> Self {
        self.message = message;
        self
    }

    /// True when retrying the same URL later could plausibly succeed.
    pub fn is_retryable_later(&self) -> bool {
        !matches!(self.kind, FailureKind::Permanent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_failure_kind_strings_are_unique() {
        let mut names: Vec<&str> = FailureKind::iter().map(|k| k.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), FailureKind::iter().count());
    }

    #[test]
    fn test_failure_kind_from_classification() {
        assert_eq!(
            FailureKind::from_classification(Classification::Blocked),
            FailureKind::Blocked
        );
        assert_eq!(
            FailureKind::from_classification(Classification::RateLimited),
            FailureKind::RateLimited
        );
        assert_eq!(
            FailureKind::from_classification(Classification::TransientError),
            FailureKind::Network
        );
        assert_eq!(
            FailureKind::from_classification(Classification::PermanentError),
            FailureKind::Permanent
        );
    }

    #[test]
    fn test_fetch_error_display_with_status() {
        let err = FetchError::new(FailureKind::Blocked, "https://example.com/", 3)
            .with_status(Some(403));
        assert_eq!(
            err.to_string(),
            "blocked fetching https://example.com/ after 3 attempt(s) (last status 403)"
        );
    }

    #[test]
    fn test_fetch_error_display_without_status() {
        let err = FetchError::new(FailureKind::Network, "https://example.com/", 2);
        assert_eq!(
            err.to_string(),
            "network error fetching https://example.com/ after 2 attempt(s)"
        );
    }

    #[test]
    fn test_is_retryable_later() {
        assert!(!FetchError::new(FailureKind::Permanent, "u", 1).is_retryable_later());
        assert!(FetchError::new(FailureKind::RateLimited, "u", 3).is_retryable_later());
        assert!(FetchError::new(FailureKind::Timeout, "u", 1).is_retryable_later());
    }
}
