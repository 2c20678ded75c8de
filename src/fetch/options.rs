//! Per-call fetch options.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::identity::Identity;
use crate::proxy::Proxy;

/// How the orchestrator routes a fetch.
#[derive(Debug, Clone, Default)]
pub enum ProxySelection {
    /// Registry selection (`best` on a session's first attempt, `random_active`
    /// afterwards), falling back to direct when configured
    #[default]
    Auto,
    /// Never use a proxy
    Direct,
    /// Always use this proxy; outcomes are not reported to the registry
    Explicit(Proxy),
}

/// Overrides for a single logical fetch.
///
/// # Examples
///
/// ```no_run
/// use adaptive_fetch::FetchOptions;
/// use std::time::Duration;
///
/// let options = FetchOptions::default()
///     .with_header("Referer", "https://example.com/")
///     .with_max_retries(5)
///     .with_timeout(Duration::from_secs(120));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Extra headers appended after the identity's template (same name replaces)
    pub headers: Vec<(String, String)>,
    /// Use this identity for every attempt instead of rotating
    pub identity: Option<Identity>,
    /// Route selection for every attempt
    pub proxy: ProxySelection,
    /// Overrides `FetchConfig::max_retries`
    pub max_retries: Option<u32>,
    /// Overall deadline for the logical fetch, pacing and backoff included
    pub timeout: Option<Duration>,
    /// External cancellation; cancelling ends the fetch with a timeout failure
    pub cancel: Option<CancellationToken>,
}

impl FetchOptions {
    /// Appends a header sent on every attempt.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Pins one identity instead of rotating.
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Routes every attempt through `proxy`, bypassing the registry.
    pub fn with_proxy(mut self, proxy: Proxy) -> Self {
        self.proxy = ProxySelection::Explicit(proxy);
        self
    }

    /// Never uses a proxy.
    pub fn direct(mut self) -> Self {
        self.proxy = ProxySelection::Direct;
        self
    }

    /// Caps the number of attempts for this fetch.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Deadline for the whole fetch.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Ends the fetch when `token` is cancelled.
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}
