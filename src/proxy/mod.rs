//! Proxy registry.
//!
//! Holds the upstream proxy endpoints and their health counters. The registry makes
//! no network calls; the orchestrator selects through [`ProxyRegistry::best`] or
//! [`ProxyRegistry::random_active`] and feeds outcomes back through
//! [`ProxyRegistry::report`].
//!
//! All mutations go through one registry-wide lock, so a counter update and the
//! status transition it triggers are applied together. The registry never fails:
//! a poisoned lock is recovered and an empty selection is signalled with `None`.

mod parse;
mod types;

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{debug, info, warn};
use rand::Rng;

use crate::config::{FetchConfig, DEFAULT_PROXY_FAILURE_THRESHOLD};

pub use parse::{load_proxy_file, parse_proxy_line, parse_proxy_list};
pub use types::{
    Proxy, ProxyCredentials, ProxyHandle, ProxyId, ProxyOutcome, ProxyProtocol, ProxyStats,
    ProxyStatus,
};

/// Shared, thread-safe set of proxies with health tracking.
#[derive(Debug)]
pub struct ProxyRegistry {
    entries: Mutex<Vec<Proxy>>,
    failure_threshold: u32,
    cooldown: Option<Duration>,
}

impl Default for ProxyRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_PROXY_FAILURE_THRESHOLD, None)
    }
}

impl ProxyRegistry {
    /// Creates an empty registry.
    ///
    /// `failure_threshold` consecutive failures move a proxy to `Failed`. With a
    /// `cooldown`, failed proxies become selectable again once it has elapsed.
    pub fn new(failure_threshold: u32, cooldown: Option<Duration>) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            failure_threshold: failure_threshold.max(1),
            cooldown,
        }
    }

    /// Empty registry using the threshold and cooldown of `config`.
    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(config.proxy_failure_threshold, config.proxy_cooldown)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Proxy>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends proxies. Duplicates are kept and tracked independently.
    pub fn add(&self, proxies: Vec<Proxy>) -> Vec<ProxyId> {
        let mut entries = self.lock();
        let start = entries.len();
        let count = proxies.len();
        entries.extend(proxies);
        debug!("Added {} proxies ({} total)", count, entries.len());
        (start..start + count).map(ProxyId).collect()
    }

    /// The selectable proxy with the highest success rate, ties broken by lowest
    /// average latency. `None` when no proxy is selectable.
    pub fn best(&self) -> Option<ProxyHandle> {
        let mut entries = self.lock();
        self.revive_cooled_down(&mut entries);
        entries
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_selectable())
            .max_by(|(_, a), (_, b)| {
                a.success_rate()
                    .total_cmp(&b.success_rate())
                    .then_with(|| b.average_latency_ms.total_cmp(&a.average_latency_ms))
            })
            .map(|(i, p)| ProxyHandle {
                id: ProxyId(i),
                proxy: p.clone(),
            })
    }

    /// Uniform random pick among selectable proxies.
    pub fn random_active(&self) -> Option<ProxyHandle> {
        self.random_active_excluding(None)
    }

    /// Uniform random pick among selectable proxies, avoiding `exclude` unless it is
    /// the only candidate.
    pub fn random_active_excluding(&self, exclude: Option<ProxyId>) -> Option<ProxyHandle> {
        let mut entries = self.lock();
        self.revive_cooled_down(&mut entries);
        let candidates: Vec<usize> = entries
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_selectable())
            .map(|(i, _)| i)
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let preferred: Vec<usize> = candidates
            .iter()
            .copied()
            .filter(|i| Some(ProxyId(*i)) != exclude)
            .collect();
        let pool = if preferred.is_empty() {
            &candidates
        } else {
            &preferred
        };
        let index = pool[rand::rng().random_range(0..pool.len())];
        Some(ProxyHandle {
            id: ProxyId(index),
            proxy: entries[index].clone(),
        })
    }

    /// Records one attempt's outcome for a proxy.
    ///
    /// Updates the counters and the running latency mean, then moves the proxy to
    /// `Failed` once its consecutive failures reach the threshold. Unknown ids are
    /// ignored.
    pub fn report(&self, id: ProxyId, outcome: ProxyOutcome, latency: Duration) {
        let mut entries = self.lock();
        let Some(proxy) = entries.get_mut(id.0) else {
            warn!("Ignoring report for unknown proxy id {}", id.0);
            return;
        };

        match outcome {
            ProxyOutcome::Success => {
                proxy.success_count += 1;
                proxy.consecutive_failures = 0;
            }
            ProxyOutcome::Failure => {
                proxy.failure_count += 1;
                proxy.consecutive_failures += 1;
            }
        }

        let samples = (proxy.success_count + proxy.failure_count) as f64;
        let latency_ms = latency.as_secs_f64() * 1000.0;
        proxy.average_latency_ms += (latency_ms - proxy.average_latency_ms) / samples;
        proxy.last_used_at = Some(Utc::now());

        if proxy.consecutive_failures >= self.failure_threshold {
            if proxy.status != ProxyStatus::Failed {
                warn!(
                    "Proxy {} marked failed after {} consecutive failures",
                    proxy, proxy.consecutive_failures
                );
                proxy.failed_at = Some(Instant::now());
            }
            proxy.status = ProxyStatus::Failed;
        } else if proxy.status == ProxyStatus::Untested {
            proxy.status = ProxyStatus::Active;
        }
    }

    /// Records a failure and moves the proxy straight to `Failed`, regardless of
    /// the threshold. Used when no client can be built for the endpoint at all.
    pub fn disable(&self, id: ProxyId) {
        let mut entries = self.lock();
        let Some(proxy) = entries.get_mut(id.0) else {
            warn!("Ignoring disable for unknown proxy id {}", id.0);
            return;
        };
        proxy.failure_count += 1;
        proxy.consecutive_failures = proxy.consecutive_failures.max(self.failure_threshold);
        proxy.last_used_at = Some(Utc::now());
        if proxy.status != ProxyStatus::Failed {
            warn!("Proxy {} marked failed: endpoint rejected", proxy);
            proxy.failed_at = Some(Instant::now());
        }
        proxy.status = ProxyStatus::Failed;
    }

    /// Moves every failed proxy back to `Active` and clears its failure streak.
    /// Historical counts are kept. Returns how many proxies were reset.
    pub fn reset_failed(&self) -> usize {
        let mut entries = self.lock();
        let mut reset = 0;
        for proxy in entries.iter_mut().filter(|p| p.status == ProxyStatus::Failed) {
            proxy.status = ProxyStatus::Active;
            proxy.consecutive_failures = 0;
            proxy.failed_at = None;
            reset += 1;
        }
        if reset > 0 {
            info!("Reset {} failed proxies", reset);
        }
        reset
    }

    /// Aggregate snapshot. Pure read.
    pub fn stats(&self) -> ProxyStats {
        let entries = self.lock();
        let count = |status: ProxyStatus| entries.iter().filter(|p| p.status == status).count();

        let successes: u64 = entries.iter().map(|p| p.success_count).sum();
        let attempts: u64 = entries
            .iter()
            .map(|p| p.success_count + p.failure_count)
            .sum();
        let reported: Vec<f64> = entries
            .iter()
            .filter(|p| p.success_count + p.failure_count > 0)
            .map(|p| p.average_latency_ms)
            .collect();

        ProxyStats {
            total: entries.len(),
            active: count(ProxyStatus::Active),
            failed: count(ProxyStatus::Failed),
            untested: count(ProxyStatus::Untested),
            success_rate: if attempts == 0 {
                0.0
            } else {
                successes as f64 / attempts as f64
            },
            average_latency_ms: if reported.is_empty() {
                0.0
            } else {
                reported.iter().sum::<f64>() / reported.len() as f64
            },
        }
    }

    /// Current state of one proxy.
    pub fn get(&self, id: ProxyId) -> Option<Proxy> {
        self.lock().get(id.0).cloned()
    }

    /// Current state of every proxy, in insertion order.
    pub fn snapshot(&self) -> Vec<ProxyHandle> {
        self.lock()
            .iter()
            .enumerate()
            .map(|(i, p)| ProxyHandle {
                id: ProxyId(i),
                proxy: p.clone(),
            })
            .collect()
    }

    /// Number of proxies, failed ones included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when no proxy was ever added.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn revive_cooled_down(&self, entries: &mut [Proxy]) {
        let Some(cooldown) = self.cooldown else {
            return;
        };
        for proxy in entries.iter_mut().filter(|p| p.status == ProxyStatus::Failed) {
            let cooled = match proxy.failed_at {
                Some(failed_at) => failed_at.elapsed() >= cooldown,
                None => true,
            };
            if cooled {
                info!("Proxy {} cooled down, selectable again", proxy);
                proxy.status = ProxyStatus::Active;
                proxy.consecutive_failures = 0;
                proxy.failed_at = None;
            }
        }
    }
}
