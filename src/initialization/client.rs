//! HTTP client initialization.
//!
//! One `reqwest::Client` is built per route: the direct route, plus one per proxy
//! endpoint (proxies are fixed at build time in reqwest). Clients are cached so
//! connection pools survive across attempts.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use log::debug;
use reqwest::ClientBuilder;

use crate::config::{FetchConfig, MAX_REDIRECT_HOPS};
use crate::proxy::Proxy;

/// Cache key of the direct route
const DIRECT_ROUTE: &str = "direct";

/// Settings shared by every client the cache builds.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Whole-request timeout
    pub request_timeout: Duration,
    /// TCP/TLS connect timeout
    pub connect_timeout: Duration,
    /// Redirect hops followed before giving up
    pub max_redirects: usize,
}

impl From<&FetchConfig> for ClientSettings {
    fn from(config: &FetchConfig) -> Self {
        Self {
            request_timeout: config.request_timeout,
            connect_timeout: config.connect_timeout,
            max_redirects: MAX_REDIRECT_HOPS,
        }
    }
}

/// Builds a client for one route.
///
/// Creates a `reqwest::Client` configured with:
/// - Per-request and connect timeouts from `settings`
/// - Redirect following up to `max_redirects` hops
/// - gzip and brotli decompression
/// - No default User-Agent (each request carries its identity's)
///
/// # Errors
///
/// Returns a `reqwest::Error` if the proxy URL is rejected or client creation fails.
pub fn build_client(
    settings: &ClientSettings,
    proxy: Option<&Proxy>,
) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = ClientBuilder::new()
        .timeout(settings.request_timeout)
        .connect_timeout(settings.connect_timeout)
        .redirect(reqwest::redirect::Policy::limited(settings.max_redirects))
        .gzip(true)
        .brotli(true);

    builder = match proxy {
        Some(proxy) => builder.proxy(proxy.to_reqwest_proxy()?),
        // Ignore HTTP(S)_PROXY from the environment on the direct route
        None => builder.no_proxy(),
    };

    builder.build()
}

/// Lazily built, per-route client cache.
#[derive(Debug)]
pub struct ClientCache {
    settings: ClientSettings,
    clients: Mutex<HashMap<String, reqwest::Client>>,
}

impl ClientCache {
    /// Empty cache; clients are built on first use.
    pub fn new(settings: ClientSettings) -> Self {
        Self {
            settings,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Client for requests without a proxy.
    pub fn direct(&self) -> Result<reqwest::Client, reqwest::Error> {
        self.get_or_build(DIRECT_ROUTE, None)
    }

    /// Client routing through `proxy`.
    pub fn for_proxy(&self, proxy: &Proxy) -> Result<reqwest::Client, reqwest::Error> {
        self.get_or_build(&proxy.route_key(), Some(proxy))
    }

    /// Number of cached clients.
    pub fn len(&self) -> usize {
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True before the first client is built.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_or_build(
        &self,
        key: &str,
        proxy: Option<&Proxy>,
    ) -> Result<reqwest::Client, reqwest::Error> {
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = clients.get(key) {
            return Ok(client.clone());
        }
        debug!("Building HTTP client for route {}", key);
        let client = build_client(&self.settings, proxy)?;
        clients.insert(key.to_string(), client.clone());
        Ok(client)
    }
}
