//! Target URL normalization and URL list loading.

use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::config::MAX_URL_LENGTH;

/// Normalizes one CLI-supplied target.
///
/// Trims whitespace, adds an `https://` prefix when no scheme is present, and
/// requires a parseable http/https URL no longer than [`MAX_URL_LENGTH`].
/// Logs a warning and returns `None` for anything else.
pub fn normalize_target_url(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let normalized = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    if normalized.len() > MAX_URL_LENGTH {
        warn!(
            "Skipping URL exceeding maximum length ({} > {}): {}...",
            normalized.len(),
            MAX_URL_LENGTH,
            normalized.chars().take(50).collect::<String>()
        );
        return None;
    }

    match url::Url::parse(&normalized) {
        Ok(parsed) if !matches!(parsed.scheme(), "http" | "https") => {
            warn!("Skipping unsupported scheme for URL: {trimmed}");
            None
        }
        Ok(_) => Some(normalized),
        Err(e) => {
            warn!("Skipping invalid URL {trimmed}: {e}");
            None
        }
    }
}

/// Normalizes a list of targets, keeping order and dropping rejects.
pub fn normalize_targets<'a, I>(inputs: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    inputs
        .into_iter()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(normalize_target_url)
        .collect()
}

/// Reads a URL list file: one URL per line, blank lines and `#` comments ignored.
pub async fn read_url_file(path: &Path) -> Result<Vec<String>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read URL file {}", path.display()))?;
    let urls = normalize_targets(text.lines());
    info!("Read {} URLs from {}", urls.len(), path.display());
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_adds_https_when_scheme_missing() {
        assert_eq!(
            normalize_target_url("example.com/search?q=bike"),
            Some("https://example.com/search?q=bike".to_string())
        );
        assert_eq!(
            normalize_target_url("  www.example.com  "),
            Some("https://www.example.com".to_string())
        );
    }

    #[test]
    fn test_preserves_http_and_https() {
        assert_eq!(
            normalize_target_url("http://example.com"),
            Some("http://example.com".to_string())
        );
        assert_eq!(
            normalize_target_url("https://example.com:8443/x"),
            Some("https://example.com:8443/x".to_string())
        );
    }

    #[test]
    fn test_rejects_other_schemes_and_garbage() {
        assert_eq!(normalize_target_url("ftp://example.com"), None);
        assert_eq!(normalize_target_url("file:///etc/passwd"), None);
        assert_eq!(normalize_target_url("not a url at all!!!"), None);
        assert_eq!(normalize_target_url(""), None);
        assert_eq!(normalize_target_url("   "), None);
    }

    #[test]
    fn test_length_limit() {
        let at_limit = format!("https://example.com/{}", "a".repeat(MAX_URL_LENGTH - 20));
        assert_eq!(at_limit.len(), MAX_URL_LENGTH);
        assert!(normalize_target_url(&at_limit).is_some());

        // Limit applies after the https:// prefix is added
        let grows_over = format!("example.com/{}", "a".repeat(MAX_URL_LENGTH - 15));
        assert!(grows_over.len() <= MAX_URL_LENGTH);
        assert_eq!(normalize_target_url(&grows_over), None);
    }

    #[test]
    fn test_normalize_targets_skips_comments() {
        let urls = normalize_targets(["# page list", "", "example.com/p1", "ftp://x", "example.com/p2"]);
        assert_eq!(
            urls,
            vec![
                "https://example.com/p1".to_string(),
                "https://example.com/p2".to_string()
            ]
        );
    }

    proptest! {
        #[test]
        fn test_normalization_is_idempotent(domain in "[a-z]{3,20}\\.[a-z]{2,5}", path in "[a-z0-9/]{0,40}") {
            let input = format!("{domain}/{path}");
            if let Some(first) = normalize_target_url(&input) {
                prop_assert_eq!(normalize_target_url(&first), Some(first.clone()));
                prop_assert!(first.starts_with("https://"));
            }
        }

        #[test]
        fn test_never_panics(input in "\\PC{0,200}") {
            let _ = normalize_target_url(&input);
        }
    }
}
