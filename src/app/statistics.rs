//! Run statistics printing.

use std::time::Duration;

use log::info;
use strum::IntoEnumIterator;

use crate::classify::Classification;
use crate::error_handling::FailureKind;
use crate::fetch::OrchestratorStats;
use crate::proxy::ProxyStats;

/// Outcome counts of one CLI run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// URLs accepted after normalization
    pub total_urls: usize,
    /// Fetches that returned a response
    pub successful: usize,
    /// Fetches that ended in a failure
    pub failed: usize,
    /// URLs never started because of an interrupt
    pub skipped: usize,
}

/// Logs the orchestrator's attempt and failure breakdown, then the proxy pool.
pub fn print_fetch_statistics(stats: &OrchestratorStats, proxies: Option<&ProxyStats>) {
    info!(
        "Requests: {} issued, {} OK ({:.1}%), {} in the last 5 minutes",
        stats.total_requests,
        stats.successful_requests,
        stats.success_rate * 100.0,
        stats.recent_requests
    );

    if stats.total_requests > 0 {
        info!("Attempt outcomes:");
        for classification in Classification::iter() {
            let count = stats.classification_count(classification);
            if count > 0 {
                info!("   {}: {}", classification.as_str(), count);
            }
        }
    }

    if stats.failed_fetches > 0 {
        info!("Failed fetches ({} total):", stats.failed_fetches);
        for kind in FailureKind::iter() {
            let count = stats.failure_count(kind);
            if count > 0 {
                info!("   {}: {}", kind.as_str(), count);
            }
        }
    }

    if let Some(proxies) = proxies.filter(|p| p.total > 0) {
        info!(
            "Proxies: {} total, {} active, {} failed, {} untested, {:.1}% success, {:.0}ms average latency",
            proxies.total,
            proxies.active,
            proxies.failed,
            proxies.untested,
            proxies.success_rate * 100.0,
            proxies.average_latency_ms
        );
    }
}

/// One-line summary of the run.
pub fn format_summary(summary: &RunSummary, elapsed: Duration) -> String {
    let mut line = format!(
        "Fetched {} URL{} ({} succeeded, {} failed) in {:.1}s",
        summary.total_urls,
        if summary.total_urls == 1 { "" } else { "s" },
        summary.successful,
        summary.failed,
        elapsed.as_secs_f64()
    );
    if summary.skipped > 0 {
        line.push_str(&format!(", {} skipped", summary.skipped));
    }
    line
}
