//! Integration tests for the CLI run loop
//!
//! These tests build a `Cli` the way the binary does and verify URL collection,
//! body output and the run summary.

use std::io::Write;

use adaptive_fetch::{run_fetch, Cli};
use clap::Parser;
use tempfile::{NamedTempFile, TempDir};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_cli(extra: &[&str]) -> Cli {
    let mut args = vec![
        "adaptive_fetch",
        "--no-pacing",
        "--backoff-base-ms",
        "1",
        "--backoff-max-ms",
        "10",
        "--max-retries",
        "2",
        "--log-level",
        "error",
    ];
    args.extend_from_slice(extra);
    Cli::parse_from(args)
}

#[tokio::test]
async fn test_run_fetch_counts_outcomes_and_saves_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>a</html>"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let out = TempDir::new().expect("Failed to create temp directory");
    let url_a = format!("{}/a", server.uri());
    let url_b = format!("{}/b", server.uri());
    let out_dir = out.path().to_string_lossy().to_string();
    let cli = fast_cli(&[&url_a, &url_b, "--output-dir", &out_dir]);

    let report = run_fetch(cli).await.expect("run should complete");

    assert_eq!(report.summary.total_urls, 2);
    assert_eq!(report.summary.successful, 1);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.skipped, 0);

    let saved = out.path().join("0001-127.0.0.1.html");
    let body = std::fs::read_to_string(saved).expect("body should be saved");
    assert_eq!(body, "<html>a</html>");
}

#[tokio::test]
async fn test_run_fetch_reads_url_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    writeln!(file, "# listing pages").expect("Failed to write URL");
    writeln!(file, "{}/page/1", server.uri()).expect("Failed to write URL");
    writeln!(file).expect("Failed to write URL");
    writeln!(file, "{}/page/2", server.uri()).expect("Failed to write URL");
    file.flush().expect("Failed to flush file");

    let path = file.path().to_string_lossy().to_string();
    let report = run_fetch(fast_cli(&["--url-file", &path]))
        .await
        .expect("run should complete");

    assert_eq!(report.summary.total_urls, 2);
    assert_eq!(report.summary.successful, 2);
}

#[tokio::test]
async fn test_run_fetch_without_urls_fails() {
    let result = run_fetch(fast_cli(&["ftp://example.com"])).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_run_fetch_missing_proxy_file_fails() {
    let result = run_fetch(fast_cli(&[
        "http://127.0.0.1:9/",
        "--proxy-file",
        "/nonexistent/proxies.txt",
    ]))
    .await;
    let err = result.expect_err("missing proxy file should fail");
    assert!(format!("{err:#}").contains("proxy file"));
}
