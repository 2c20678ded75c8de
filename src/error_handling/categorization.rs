//! Transport error categorization.
//!
//! A response that arrives is classified by [`ResponseClassifier`](crate::ResponseClassifier).
//! A request that never produced a response ends up here instead.

use crate::classify::Classification;

/// Classifies a `reqwest::Error` raised before a usable response was read.
///
/// DNS failures, refused connections, socket timeouts and truncated bodies are
/// transient: another attempt (possibly through another proxy) may succeed.
/// Builder errors mean the request itself cannot be constructed, so retrying is
/// pointless.
pub fn classify_transport_error(error: &reqwest::Error) -> Classification {
    if error.is_builder() {
        return Classification::PermanentError;
    }

    // Redirect loops are a property of the target, not of the route
    if error.is_redirect() {
        return Classification::PermanentError;
    }

    if error.is_timeout()
        || error.is_connect()
        || error.is_request()
        || error.is_body()
        || error.is_decode()
    {
        return Classification::TransientError;
    }

    // Unknown transport failures are treated as transient
    Classification::TransientError
}

/// Short human-readable label for a transport error, used in logs and failure messages.
pub fn describe_transport_error(error: &reqwest::Error) -> &'static str {
    if error.is_builder() {
        "request builder error"
    } else if error.is_redirect() {
        "redirect error"
    } else if error.is_timeout() {
        "request timeout"
    } else if error.is_connect() {
        "connection error"
    } else if error.is_request() {
        "request error"
    } else if error.is_body() {
        "body read error"
    } else if error.is_decode() {
        "decode error"
    } else {
        "transport error"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_connection_refused_is_transient() {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        // Port 1 on loopback is reliably closed
        let err = client.get("http://127.0.0.1:1/").send().await.unwrap_err();
        assert_eq!(
            classify_transport_error(&err),
            Classification::TransientError
        );
        assert_eq!(describe_transport_error(&err), "connection error");
    }

    #[tokio::test]
    async fn test_builder_error_is_permanent() {
        let client = reqwest::Client::new();
        let err = client.get("not a url").send().await.unwrap_err();
        assert_eq!(
            classify_transport_error(&err),
            Classification::PermanentError
        );
        assert_eq!(describe_transport_error(&err), "request builder error");
    }
}
