//! Saving fetched bodies to disk.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::fetch::FetchResponse;

/// File name for the `index`-th fetched page: `0001-example.com.html`.
pub fn body_file_name(index: usize, final_url: &str) -> String {
    let host = url::Url::parse(final_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "page".to_string());
    let safe: String = host
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    format!("{index:04}-{safe}.html")
}

/// Writes the response body into `dir`, creating it if needed. Returns the file path.
pub async fn save_body(dir: &Path, index: usize, response: &FetchResponse) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    let path = dir.join(body_file_name(index, &response.final_url));
    tokio::fs::write(&path, response.body.as_bytes())
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
