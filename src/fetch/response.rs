//! Successful fetch result.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;

/// Result of a logical fetch whose last attempt classified as OK.
#[derive(Debug, Clone, Serialize)]
pub struct FetchResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw body text (truncated to `max_body_bytes`)
    pub body: String,
    /// Response headers, lower-case names; repeated headers are joined with ", "
    pub headers: HashMap<String, String>,
    /// URL after redirects
    pub final_url: String,
    /// Attempts issued, the successful one included
    pub attempts: u32,
    /// Wall time of the whole logical fetch, pacing included
    pub elapsed: Duration,
    /// Endpoint of the proxy that served the response, if any
    pub proxy: Option<String>,
    /// Label of the identity used on the successful attempt
    pub identity: String,
    /// The body was cut at `max_body_bytes`
    pub truncated: bool,
}

impl FetchResponse {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Collects a `HeaderMap` into a name -> value map, joining repeated headers.
pub(crate) fn collect_headers(headers: &reqwest::header::HeaderMap) -> HashMap<String, String> {
    let mut collected: HashMap<String, String> = HashMap::with_capacity(headers.len());
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        collected
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    collected
}

/// Cuts `body` to at most `max_bytes`, on a char boundary. Returns whether it was cut.
pub(crate) fn truncate_body(body: &mut String, max_bytes: usize) -> bool {
    if body.len() <= max_bytes {
        return false;
    }
    let mut cut = max_bytes;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    body.truncate(cut);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    #[test]
    fn test_collect_headers_joins_repeats() {
        let mut map = HeaderMap::new();
        map.append("set-cookie", HeaderValue::from_static("a=1"));
        map.append("set-cookie", HeaderValue::from_static("b=2"));
        map.insert("content-type", HeaderValue::from_static("text/html"));
        let headers = collect_headers(&map);
        assert_eq!(headers["set-cookie"], "a=1, b=2");
        assert_eq!(headers["content-type"], "text/html");
    }

    #[test]
    fn test_truncate_body_respects_char_boundary() {
        let mut body = "zażółć".to_string();
        assert!(truncate_body(&mut body, 3));
        assert_eq!(body, "za");

        let mut short = "ok".to_string();
        assert!(!truncate_body(&mut short, 10));
        assert_eq!(short, "ok");
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = FetchResponse {
            status: 200,
            body: String::new(),
            headers: HashMap::from([("content-type".to_string(), "text/html".to_string())]),
            final_url: "https://example.com/".to_string(),
            attempts: 1,
            elapsed: Duration::ZERO,
            proxy: None,
            identity: "chrome-windows".to_string(),
            truncated: false,
        };
        assert_eq!(response.header("Content-Type"), Some("text/html"));
        assert_eq!(response.header("x-missing"), None);
    }
}
