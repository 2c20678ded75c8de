//! Orchestrator session statistics.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::IntoEnumIterator;
use tokio::time::{Duration, Instant};

use crate::classify::Classification;
use crate::error_handling::FailureKind;

/// Counters owned by one orchestrator. Not shared across instances.
#[derive(Debug)]
pub(crate) struct SessionStats {
    total_requests: u64,
    successful_requests: u64,
    failed_fetches: u64,
    recent: VecDeque<Instant>,
    window: Duration,
    session_started_at: DateTime<Utc>,
    session_requests: u32,
    session_fingerprint: Option<String>,
    classifications: HashMap<Classification, u64>,
    failures: HashMap<FailureKind, u64>,
}

impl SessionStats {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            total_requests: 0,
            successful_requests: 0,
            failed_fetches: 0,
            recent: VecDeque::new(),
            window,
            session_started_at: Utc::now(),
            session_requests: 0,
            session_fingerprint: None,
            classifications: Classification::iter().map(|c| (c, 0)).collect(),
            failures: FailureKind::iter().map(|k| (k, 0)).collect(),
        }
    }

    /// Starts a new session; its fingerprint is taken from the next attempt.
    pub(crate) fn start_session(&mut self) {
        self.session_started_at = Utc::now();
        self.session_requests = 0;
        self.session_fingerprint = None;
    }

    /// Records one issued attempt.
    pub(crate) fn record_attempt(&mut self, identity_label: &str) {
        self.total_requests += 1;
        self.session_requests += 1;
        self.recent.push_back(Instant::now());
        if self.session_fingerprint.is_none() {
            self.session_fingerprint = Some(identity_label.to_string());
        }
    }

    pub(crate) fn record_classification(&mut self, classification: Classification) {
        *self.classifications.entry(classification).or_insert(0) += 1;
        if classification == Classification::Ok {
            self.successful_requests += 1;
        }
    }

    pub(crate) fn record_failure(&mut self, kind: FailureKind) {
        self.failed_fetches += 1;
        *self.failures.entry(kind).or_insert(0) += 1;
    }

    /// Snapshot; drops window entries older than the window first.
    pub(crate) fn snapshot(&mut self) -> OrchestratorStats {
        let now = Instant::now();
        while let Some(front) = self.recent.front() {
            if now.duration_since(*front) > self.window {
                self.recent.pop_front();
            } else {
                break;
            }
        }

        OrchestratorStats {
            total_requests: self.total_requests,
            successful_requests: self.successful_requests,
            failed_fetches: self.failed_fetches,
            success_rate: if self.total_requests == 0 {
                0.0
            } else {
                self.successful_requests as f64 / self.total_requests as f64
            },
            recent_requests: self.recent.len(),
            session_started_at: self.session_started_at,
            session_requests: self.session_requests,
            session_fingerprint: self.session_fingerprint.clone(),
            classifications: self.classifications.clone(),
            failures: self.failures.clone(),
        }
    }
}

/// Read-only orchestrator snapshot for monitoring and CLI display.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorStats {
    /// Attempts issued since construction
    pub total_requests: u64,
    /// Attempts classified OK
    pub successful_requests: u64,
    /// Logical fetches that ended in a failure
    pub failed_fetches: u64,
    /// successful_requests / total_requests
    pub success_rate: f64,
    /// Attempts issued in the last five minutes
    pub recent_requests: usize,
    /// When the current session's first slot was granted
    pub session_started_at: DateTime<Utc>,
    /// Attempts issued in the current session
    pub session_requests: u32,
    /// Identity label of the current session's first attempt
    pub session_fingerprint: Option<String>,
    /// Attempts per classification (transport errors included)
    pub classifications: HashMap<Classification, u64>,
    /// Failed logical fetches per kind
    pub failures: HashMap<FailureKind, u64>,
}

impl OrchestratorStats {
    /// Attempts that ended with `classification`.
    pub fn classification_count(&self, classification: Classification) -> u64 {
        self.classifications
            .get(&classification)
            .copied()
            .unwrap_or(0)
    }

    /// Failed fetches of `kind`.
    pub fn failure_count(&self, kind: FailureKind) -> u64 {
        self.failures.get(&kind).copied().unwrap_or(0)
    }
}
