//! Fetch orchestrator.
//!
//! Executes one logical fetch as a bounded sequence of attempts. Each attempt waits
//! for a pacing slot, picks a fresh identity and proxy, issues the request and
//! classifies the outcome:
//!
//! - `OK`: the proxy is credited and the response returned
//! - `BLOCKED`, `RATE_LIMITED`, `TRANSIENT_ERROR` or a transport error: the proxy is
//!   charged a failure, the orchestrator backs off and tries again
//! - `PERMANENT_ERROR`: returned at once
//!
//! When attempts run out, the last classification decides the [`FailureKind`].
//! A caller deadline or cancellation interrupts any wait or in-flight request and
//! ends the fetch with [`FailureKind::Timeout`].

mod backoff;
mod interrupt;
mod options;
mod response;
mod stats;

use std::sync::Arc;

use log::{debug, info, warn};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use url::Url;

use crate::classify::{Classification, ResponseClassifier};
use crate::config::{FetchConfig, RECENT_REQUESTS_WINDOW};
use crate::error_handling::{
    classify_transport_error, describe_transport_error, FailureKind, FetchError,
};
use crate::identity::{Identity, IdentityPool};
use crate::initialization::{ClientCache, ClientSettings};
use crate::pacing::{PacingConfig, RatePacer};
use crate::proxy::{Proxy, ProxyId, ProxyOutcome, ProxyRegistry};

use backoff::{retry_after, BackoffPolicy};
use interrupt::{Interrupt, Interrupted};
use response::{collect_headers, truncate_body};
use stats::SessionStats;

pub use options::{FetchOptions, ProxySelection};
pub use response::FetchResponse;
pub use stats::OrchestratorStats;

/// Network route of one attempt.
enum Route {
    Direct,
    Registry(ProxyId, Proxy),
    Explicit(Proxy),
}

impl Route {
    fn registry_id(&self) -> Option<ProxyId> {
        match self {
            Route::Registry(id, _) => Some(*id),
            _ => None,
        }
    }

    fn proxy(&self) -> Option<&Proxy> {
        match self {
            Route::Direct => None,
            Route::Registry(_, proxy) | Route::Explicit(proxy) => Some(proxy),
        }
    }

    fn label(&self) -> String {
        match self.proxy() {
            Some(proxy) => proxy.endpoint(),
            None => "direct".to_string(),
        }
    }
}

/// A response as read off the wire, before classification.
struct RawResponse {
    status: u16,
    body: String,
    headers: HeaderMap,
    final_url: String,
    truncated: bool,
}

/// What the last failed attempt left behind.
#[derive(Default)]
struct LastFailure {
    classification: Option<Classification>,
    status: Option<u16>,
    message: Option<String>,
}

/// Composes identity rotation, proxy health, pacing and classification into
/// retried fetches.
///
/// Fetches are meant to be issued one after another; the pacer serializes
/// concurrent callers. The proxy registry and identity pool may be shared with
/// other orchestrators, the session statistics are owned by this instance.
///
/// # Examples
///
/// ```no_run
/// use adaptive_fetch::{FetchConfig, FetchOrchestrator};
///
/// # async fn run() {
/// let orchestrator = FetchOrchestrator::new(FetchConfig::default());
/// match orchestrator.fetch("https://example.com/listings?page=1").await {
///     Ok(response) => println!("{} bytes", response.body.len()),
///     Err(failure) => eprintln!("{failure} ({:?})", failure.kind),
/// }
/// # }
/// ```
pub struct FetchOrchestrator {
    config: FetchConfig,
    identities: Arc<IdentityPool>,
    proxies: Arc<ProxyRegistry>,
    pacer: RatePacer,
    classifier: ResponseClassifier,
    backoff: BackoffPolicy,
    clients: ClientCache,
    stats: Mutex<SessionStats>,
}

impl FetchOrchestrator {
    /// Creates an orchestrator with its own identity pool and an empty proxy registry.
    pub fn new(config: FetchConfig) -> Self {
        let identities = Arc::new(IdentityPool::from_config(&config));
        let proxies = Arc::new(ProxyRegistry::from_config(&config));
        Self::with_parts(config, identities, proxies)
    }

    /// Creates an orchestrator sharing an existing proxy registry.
    pub fn with_registry(config: FetchConfig, proxies: Arc<ProxyRegistry>) -> Self {
        let identities = Arc::new(IdentityPool::from_config(&config));
        Self::with_parts(config, identities, proxies)
    }

    /// Creates an orchestrator from explicitly constructed collaborators.
    pub fn with_parts(
        config: FetchConfig,
        identities: Arc<IdentityPool>,
        proxies: Arc<ProxyRegistry>,
    ) -> Self {
        let config = config.validate();
        Self {
            pacer: RatePacer::new(PacingConfig::from(&config)),
            classifier: ResponseClassifier::from_config(&config),
            backoff: BackoffPolicy::from_config(&config),
            clients: ClientCache::new(ClientSettings::from(&config)),
            stats: Mutex::new(SessionStats::new(RECENT_REQUESTS_WINDOW)),
            identities,
            proxies,
            config,
        }
    }

    /// The validated configuration in effect.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// The proxy registry consulted on every attempt.
    pub fn registry(&self) -> &Arc<ProxyRegistry> {
        &self.proxies
    }

    /// The identity pool used when no identity is forced.
    pub fn identities(&self) -> &Arc<IdentityPool> {
        &self.identities
    }

    /// Fetches `url` with default options.
    pub async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        self.fetch_with(url, FetchOptions::default()).await
    }

    /// Fetches `url`, retrying with fresh identities and proxies until an OK
    /// response, a permanent error, or the attempt budget runs out.
    pub async fn fetch_with(
        &self,
        url: &str,
        options: FetchOptions,
    ) -> Result<FetchResponse, FetchError> {
        let started = Instant::now();

        let target = match parse_target(url) {
            Ok(target) => target,
            Err(message) => {
                warn!("Rejecting {}: {}", url, message);
                return Err(self
                    .fail(FetchError::new(FailureKind::Permanent, url, 0).with_message(Some(message)))
                    .await);
            }
        };

        let max_retries = options
            .max_retries
            .unwrap_or(self.config.max_retries)
            .max(1);
        let interrupt = Interrupt::new(options.timeout, options.cancel.clone());
        let mut schedule = self.backoff.schedule();
        let mut attempts: u32 = 0;
        let mut last = LastFailure::default();
        let mut previous_proxy: Option<ProxyId> = None;

        while attempts < max_retries {
            if let Err(reason) = interrupt.check() {
                return Err(self.interrupted(url, attempts, reason, &last).await);
            }
            let grant = match interrupt.guard(self.pacer.wait_for_slot()).await {
                Ok(grant) => grant,
                Err(reason) => return Err(self.interrupted(url, attempts, reason, &last).await),
            };
            if grant.new_session {
                self.stats.lock().await.start_session();
            }

            let identity = match &options.identity {
                Some(identity) => identity.clone(),
                None => self.identities.next(),
            };

            let (route, client) =
                match self.connect_route(&options.proxy, grant.new_session, previous_proxy) {
                    Some(connected) => connected,
                    None => {
                        warn!("No usable proxy for {} and direct fallback is disabled", url);
                        return Err(self
                            .fail(
                                FetchError::new(FailureKind::Network, url, attempts)
                                    .with_status(last.status)
                                    .with_message(Some("no active proxy available".to_string())),
                            )
                            .await);
                    }
                };
            previous_proxy = route.registry_id().or(previous_proxy);

            attempts += 1;
            self.stats.lock().await.record_attempt(&identity.label);
            debug!(
                "Attempt {}/{} for {} as {} via {}",
                attempts,
                max_retries,
                url,
                identity.label,
                route.label()
            );

            let attempt_started = Instant::now();
            let result = match client {
                Ok(client) => {
                    interrupt
                        .guard(self.send(client, &target, &identity, &options.headers))
                        .await
                }
                Err(error) => Ok(Err(error)),
            };
            let latency = attempt_started.elapsed();
            self.pacer.mark_complete().await;

            let result = match result {
                Ok(result) => result,
                Err(reason) => {
                    // The proxy did not deliver in time either way
                    if let Some(id) = route.registry_id() {
                        self.proxies.report(id, ProxyOutcome::Failure, latency);
                    }
                    return Err(self.interrupted(url, attempts, reason, &last).await);
                }
            };

            let (classification, retry_hint) = match result {
                Ok(raw) => {
                    let (classification, reason) =
                        self.classifier.classify_with_reason(raw.status, &raw.body);
                    self.stats.lock().await.record_classification(classification);

                    if classification == Classification::Ok {
                        if let Some(id) = route.registry_id() {
                            self.proxies.report(id, ProxyOutcome::Success, latency);
                        }
                        info!(
                            "Fetched {} ({}) in {} attempt(s) via {}",
                            url,
                            raw.status,
                            attempts,
                            route.label()
                        );
                        return Ok(FetchResponse {
                            status: raw.status,
                            headers: collect_headers(&raw.headers),
                            body: raw.body,
                            final_url: raw.final_url,
                            attempts,
                            elapsed: started.elapsed(),
                            proxy: route.proxy().map(Proxy::endpoint),
                            identity: identity.label,
                            truncated: raw.truncated,
                        });
                    }

                    last = LastFailure {
                        classification: Some(classification),
                        status: Some(raw.status),
                        message: reason.map(|r| format!("matched signature {r:?}")),
                    };
                    (classification, retry_after(&raw.headers))
                }
                Err(error) => {
                    let classification = classify_transport_error(&error);
                    self.stats.lock().await.record_classification(classification);
                    debug!(
                        "{} on attempt {} for {}: {}",
                        describe_transport_error(&error),
                        attempts,
                        url,
                        error
                    );
                    last = LastFailure {
                        classification: Some(classification),
                        status: None,
                        message: Some(error.to_string()),
                    };
                    (classification, None)
                }
            };

            if classification == Classification::PermanentError {
                warn!(
                    "Permanent error for {}{}, not retrying",
                    url,
                    last.status.map(|s| format!(" (status {s})")).unwrap_or_default()
                );
                return Err(self
                    .fail(
                        FetchError::new(FailureKind::Permanent, url, attempts)
                            .with_status(last.status)
                            .with_message(last.message),
                    )
                    .await);
            }

            if let Some(id) = route.registry_id() {
                self.proxies.report(id, ProxyOutcome::Failure, latency);
            }

            match classification {
                Classification::Blocked | Classification::RateLimited => warn!(
                    "{} on attempt {}/{} for {} via {} as {}",
                    classification,
                    attempts,
                    max_retries,
                    url,
                    route.label(),
                    identity.label
                ),
                _ => debug!(
                    "{} on attempt {}/{} for {}",
                    classification, attempts, max_retries, url
                ),
            }

            if attempts < max_retries {
                let scheduled = schedule.next().unwrap_or(self.backoff.max());
                let delay = self.backoff.delay(scheduled, classification, retry_hint);
                debug!("Backing off {:?} before retrying {}", delay, url);
                if let Err(reason) = interrupt.guard(sleep(delay)).await {
                    return Err(self.interrupted(url, attempts, reason, &last).await);
                }
            }
        }

        let kind = last
            .classification
            .map(FailureKind::from_classification)
            .unwrap_or(FailureKind::Network);
        warn!(
            "Giving up on {} after {} attempt(s): {}",
            url, attempts, kind
        );
        Err(self
            .fail(
                FetchError::new(kind, url, attempts)
                    .with_status(last.status)
                    .with_message(last.message),
            )
            .await)
    }

    /// Snapshot of this orchestrator's statistics.
    pub async fn stats(&self) -> OrchestratorStats {
        self.stats.lock().await.snapshot()
    }

    fn select_route(
        &self,
        selection: &ProxySelection,
        first_in_session: bool,
        previous: Option<ProxyId>,
    ) -> Option<Route> {
        match selection {
            ProxySelection::Direct => Some(Route::Direct),
            ProxySelection::Explicit(proxy) => Some(Route::Explicit(proxy.clone())),
            ProxySelection::Auto if !self.config.use_proxies || self.proxies.is_empty() => {
                Some(Route::Direct)
            }
            ProxySelection::Auto => {
                let picked = if first_in_session {
                    self.proxies.best()
                } else {
                    self.proxies.random_active_excluding(previous)
                };
                match picked {
                    Some(handle) => Some(Route::Registry(handle.id, handle.proxy)),
                    None if self.config.direct_fallback => {
                        debug!("No active proxy, falling back to a direct request");
                        Some(Route::Direct)
                    }
                    None => None,
                }
            }
        }
    }

    /// Selects a route and the client serving it. A registry proxy that reqwest
    /// rejects outright is disabled and selection runs again, so a bad endpoint
    /// never reaches URL classification.
    fn connect_route(
        &self,
        selection: &ProxySelection,
        first_in_session: bool,
        previous: Option<ProxyId>,
    ) -> Option<(Route, Result<reqwest::Client, reqwest::Error>)> {
        // A cooldown may revive a disabled proxy at once, so bound the retries
        for _ in 0..=self.proxies.len() {
            let route = self.select_route(selection, first_in_session, previous)?;
            let client = match route.proxy() {
                Some(proxy) => self.clients.for_proxy(proxy),
                None => self.clients.direct(),
            };
            match (client, route.registry_id()) {
                (Err(error), Some(id)) => {
                    warn!("No client for proxy {}: {}", route.label(), error);
                    self.proxies.disable(id);
                }
                (client, _) => return Some((route, client)),
            }
        }
        self.config
            .direct_fallback
            .then(|| (Route::Direct, self.clients.direct()))
    }

    async fn send(
        &self,
        client: reqwest::Client,
        target: &Url,
        identity: &Identity,
        extra_headers: &[(String, String)],
    ) -> Result<RawResponse, reqwest::Error> {
        let response = client
            .get(target.clone())
            .headers(request_headers(identity, extra_headers))
            .send()
            .await?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = response.headers().clone();
        let (body, truncated) = read_body(response, self.config.max_body_bytes).await?;
        if truncated {
            warn!(
                "Body of {} exceeded {} bytes, truncated",
                final_url, self.config.max_body_bytes
            );
        }

        Ok(RawResponse {
            status,
            body,
            headers,
            final_url,
            truncated,
        })
    }

    async fn interrupted(
        &self,
        url: &str,
        attempts: u32,
        reason: Interrupted,
        last: &LastFailure,
    ) -> FetchError {
        warn!(
            "Fetch of {} {} after {} attempt(s)",
            url,
            reason.describe(),
            attempts
        );
        self.fail(
            FetchError::new(FailureKind::Timeout, url, attempts)
                .with_status(last.status)
                .with_message(Some(reason.describe().to_string())),
        )
        .await
    }

    async fn fail(&self, error: FetchError) -> FetchError {
        self.stats.lock().await.record_failure(error.kind);
        error
    }
}

/// Validates the target URL: absolute, http or https.
fn parse_target(url: &str) -> Result<Url, String> {
    let parsed = Url::parse(url).map_err(|e| format!("invalid URL: {e}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(format!("unsupported URL scheme {other:?}")),
    }
}

/// Identity template, then extra headers, with User-Agent from the identity unless
/// an extra header overrides it. Invalid names or values are skipped.
fn request_headers(identity: &Identity, extra: &[(String, String)]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&identity.user_agent) {
        headers.insert(USER_AGENT, value);
    }
    for (name, value) in identity.headers.iter().chain(extra) {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => debug!("Skipping invalid header {:?}", name),
        }
    }
    headers
}

/// Reads at most `max_bytes` of the body. Returns the text and whether it was cut.
async fn read_body(
    mut response: reqwest::Response,
    max_bytes: usize,
) -> Result<(String, bool), reqwest::Error> {
    let mut bytes: Vec<u8> = Vec::new();
    let mut overflow = false;
    while let Some(chunk) = response.chunk().await? {
        bytes.extend_from_slice(&chunk);
        if bytes.len() > max_bytes {
            overflow = true;
            break;
        }
    }
    let mut body = String::from_utf8_lossy(&bytes).into_owned();
    let truncated = truncate_body(&mut body, max_bytes) || overflow;
    Ok((body, truncated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target() {
        assert!(parse_target("https://example.com/search?q=x").is_ok());
        assert!(parse_target("http://example.com").is_ok());
        assert!(parse_target("ftp://example.com").is_err());
        assert!(parse_target("not a url").is_err());
        assert!(parse_target("").is_err());
    }

    #[test]
    fn test_request_headers_order_and_override() {
        let identity = crate::identity::default_profiles()
            .into_iter()
            .find(|i| i.label == "chrome-windows")
            .unwrap();
        let extra = vec![
            ("Accept-Language".to_string(), "pl-PL,pl;q=0.9".to_string()),
            ("Referer".to_string(), "https://example.com/".to_string()),
            ("bad header".to_string(), "x".to_string()),
        ];
        let headers = request_headers(&identity, &extra);
        assert_eq!(
            headers.get(USER_AGENT).unwrap().to_str().unwrap(),
            identity.user_agent
        );
        assert_eq!(headers.get("accept-language").unwrap(), "pl-PL,pl;q=0.9");
        assert_eq!(headers.get("referer").unwrap(), "https://example.com/");
        assert!(headers.get("sec-ch-ua").is_some());
        assert_eq!(headers.get_all("accept-language").iter().count(), 1);
    }

    #[test]
    fn test_route_labels() {
        let proxy = Proxy::new("10.0.0.1", 8080, crate::proxy::ProxyProtocol::Http);
        assert_eq!(Route::Direct.label(), "direct");
        assert_eq!(Route::Explicit(proxy.clone()).label(), "http://10.0.0.1:8080");
        assert!(Route::Explicit(proxy).registry_id().is_none());
    }
}
