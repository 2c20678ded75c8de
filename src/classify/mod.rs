//! Response classification.
//!
//! Labels one HTTP attempt so the orchestrator can decide between returning,
//! retrying with a fresh identity, or giving up. Rules, in priority order:
//!
//! 1. `200` with no blocking signature in the body: `Ok`
//! 2. `403`: `Blocked`, `429`: `RateLimited`
//! 3. a block signature anywhere in the body, whatever the status: `Blocked`
//!    (`RateLimited` for phrases on the optional rate-limit list)
//! 4. transient server statuses (`500`, `502`, `503`, `504` by default): `TransientError`
//! 5. any other non-2xx status: `PermanentError`
//!
//! Signature matching runs on `200` responses too, since soft-block pages are
//! commonly served with a success status.

use serde::Serialize;
use strum_macros::EnumIter as EnumIterMacro;

use crate::config::{
    FetchConfig, DEFAULT_BLOCK_SIGNATURES, DEFAULT_RATE_LIMIT_SIGNATURES,
    DEFAULT_TRANSIENT_STATUSES, HTTP_STATUS_FORBIDDEN, HTTP_STATUS_OK,
    HTTP_STATUS_TOO_MANY_REQUESTS,
};

/// Verdict on a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    /// 2xx with no block signature in the body
    Ok,
    /// 403 or an anti-automation page
    Blocked,
    /// 429 or an opt-in rate-limit signature
    RateLimited,
    /// Server hiccup or transport error worth another attempt
    TransientError,
    /// Any other status; retrying will not help
    PermanentError,
}

impl Classification {
    /// SCREAMING_SNAKE_CASE label, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Ok => "OK",
            Classification::Blocked => "BLOCKED",
            Classification::RateLimited => "RATE_LIMITED",
            Classification::TransientError => "TRANSIENT_ERROR",
            Classification::PermanentError => "PERMANENT_ERROR",
        }
    }

    /// Whether the orchestrator should spend another attempt on this outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Classification::Blocked | Classification::RateLimited | Classification::TransientError
        )
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status and body based classifier with configurable signature lists.
#[derive(Debug, Clone)]
pub struct ResponseClassifier {
    block_signatures: Vec<String>,
    rate_limit_signatures: Vec<String>,
    transient_statuses: Vec<u16>,
}

impl Default for ResponseClassifier {
    fn default() -> Self {
        Self::new(
            DEFAULT_BLOCK_SIGNATURES.iter().map(|s| s.to_string()).collect(),
            DEFAULT_RATE_LIMIT_SIGNATURES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            DEFAULT_TRANSIENT_STATUSES.to_vec(),
        )
    }
}

impl ResponseClassifier {
    /// Creates a classifier. Signatures are matched case-insensitively.
    pub fn new(
        block_signatures: Vec<String>,
        rate_limit_signatures: Vec<String>,
        transient_statuses: Vec<u16>,
    ) -> Self {
        let normalize = |list: Vec<String>| -> Vec<String> {
            list.into_iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        };
        Self {
            block_signatures: normalize(block_signatures),
            rate_limit_signatures: normalize(rate_limit_signatures),
            transient_statuses,
        }
    }

    /// Classifier using the signature lists and transient statuses of `config`.
    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(
            config.block_signatures.clone(),
            config.rate_limit_signatures.clone(),
            config.transient_statuses.clone(),
        )
    }

    /// Classifies one response.
    pub fn classify(&self, status_code: u16, body: &str) -> Classification {
        self.classify_with_reason(status_code, body).0
    }

    /// Classifies one response and returns the signature that triggered a block, if any.
    pub fn classify_with_reason(
        &self,
        status_code: u16,
        body: &str,
    ) -> (Classification, Option<&str>) {
        let signature = self.find_signature(body);

        if status_code == HTTP_STATUS_OK && signature.is_none() {
            return (Classification::Ok, None);
        }

        if status_code == HTTP_STATUS_FORBIDDEN {
            return (Classification::Blocked, signature.map(|(s, _)| s));
        }
        if status_code == HTTP_STATUS_TOO_MANY_REQUESTS {
            return (Classification::RateLimited, signature.map(|(s, _)| s));
        }

        if let Some((sig, classification)) = signature {
            return (classification, Some(sig));
        }

        if self.transient_statuses.contains(&status_code) {
            return (Classification::TransientError, None);
        }

        if (200..300).contains(&status_code) {
            return (Classification::Ok, None);
        }

        (Classification::PermanentError, None)
    }

    fn find_signature(&self, body: &str) -> Option<(&str, Classification)> {
        if body.is_empty() {
            return None;
        }
        let haystack = body.to_lowercase();
        if let Some(sig) = self
            .block_signatures
            .iter()
            .find(|sig| haystack.contains(sig.as_str()))
        {
            return Some((sig.as_str(), Classification::Blocked));
        }
        self.rate_limit_signatures
            .iter()
            .find(|sig| haystack.contains(sig.as_str()))
            .map(|sig| (sig.as_str(), Classification::RateLimited))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_200_is_ok() {
        let classifier = ResponseClassifier::default();
        assert_eq!(
            classifier.classify(200, "<html><body>iPhone 13 128GB</body></html>"),
            Classification::Ok
        );
    }

    #[test]
    fn test_200_with_captcha_is_blocked() {
        let classifier = ResponseClassifier::default();
        assert_eq!(
            classifier.classify(200, "<div class=\"g-recaptcha\">Please solve the CAPTCHA</div>"),
            Classification::Blocked
        );
    }

    #[test]
    fn test_status_403_and_429() {
        let classifier = ResponseClassifier::default();
        assert_eq!(classifier.classify(403, ""), Classification::Blocked);
        assert_eq!(classifier.classify(429, ""), Classification::RateLimited);
        // Status wins over body signatures for these two
        assert_eq!(
            classifier.classify(429, "captcha"),
            Classification::RateLimited
        );
    }

    #[test]
    fn test_signature_overrides_other_statuses() {
        let classifier = ResponseClassifier::default();
        assert_eq!(
            classifier.classify(404, "Access Denied"),
            Classification::Blocked
        );
        assert_eq!(
            classifier.classify(503, "DDoS protection by Cloudflare"),
            Classification::Blocked
        );
        assert_eq!(
            classifier.classify(200, "Too Many Requests, slow down"),
            Classification::Blocked
        );
    }

    #[test]
    fn test_transient_statuses() {
        let classifier = ResponseClassifier::default();
        for status in [500, 502, 503, 504] {
            assert_eq!(
                classifier.classify(status, "upstream hiccup"),
                Classification::TransientError
            );
        }
    }

    #[test]
    fn test_other_statuses_are_permanent() {
        let classifier = ResponseClassifier::default();
        assert_eq!(classifier.classify(404, "not here"), Classification::PermanentError);
        assert_eq!(classifier.classify(410, ""), Classification::PermanentError);
        assert_eq!(classifier.classify(301, ""), Classification::PermanentError);
        assert_eq!(classifier.classify(501, ""), Classification::PermanentError);
    }

    #[test]
    fn test_other_2xx_is_ok() {
        let classifier = ResponseClassifier::default();
        assert_eq!(classifier.classify(204, ""), Classification::Ok);
    }

    #[test]
    fn test_custom_signatures() {
        let classifier = ResponseClassifier::new(
            vec!["  Verify You Are Human ".to_string(), String::new()],
            vec![],
            vec![520],
        );
        assert_eq!(
            classifier.classify(200, "please VERIFY you are human"),
            Classification::Blocked
        );
        assert_eq!(classifier.classify(200, "captcha"), Classification::Ok);
        assert_eq!(classifier.classify(520, ""), Classification::TransientError);
        assert_eq!(classifier.classify(503, ""), Classification::PermanentError);
    }

    #[test]
    fn test_classify_with_reason_reports_signature() {
        let classifier = ResponseClassifier::default();
        let (classification, reason) = classifier.classify_with_reason(200, "Rate limit exceeded");
        assert_eq!(classification, Classification::Blocked);
        assert_eq!(reason, Some("rate limit"));
    }

    #[test]
    fn test_rate_limit_signatures_apply_after_block_signatures() {
        let classifier = ResponseClassifier::new(
            vec!["captcha".to_string()],
            vec!["slow down".to_string()],
            vec![503],
        );
        assert_eq!(
            classifier.classify(200, "Please slow down"),
            Classification::RateLimited
        );
        assert_eq!(
            classifier.classify(503, "slow down or solve the captcha"),
            Classification::Blocked
        );
    }

    #[test]
    fn test_is_retryable() {
        assert!(Classification::Blocked.is_retryable());
        assert!(Classification::RateLimited.is_retryable());
        assert!(Classification::TransientError.is_retryable());
        assert!(!Classification::Ok.is_retryable());
        assert!(!Classification::PermanentError.is_retryable());
    }
}
