//! Proxy data model.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Protocol spoken to the proxy endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyProtocol {
    /// Plain HTTP proxy (CONNECT for https targets)
    Http,
    /// HTTP proxy reached over TLS
    Https,
    /// SOCKS5 proxy
    Socks5,
}

impl ProxyProtocol {
    /// URL scheme used to address the proxy.
    pub fn scheme(&self) -> &'static str {
        match self {
            ProxyProtocol::Http => "http",
            ProxyProtocol::Https => "https",
            ProxyProtocol::Socks5 => "socks5",
        }
    }

    /// Parses a scheme prefix from a proxy list line. `socks5h` maps to SOCKS5.
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme.to_ascii_lowercase().as_str() {
            "http" => Some(ProxyProtocol::Http),
            "https" => Some(ProxyProtocol::Https),
            "socks5" | "socks5h" => Some(ProxyProtocol::Socks5),
            _ => None,
        }
    }
}

/// Health state of a proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyStatus {
    /// Reported at least once and below the failure threshold
    Active,
    /// Hit the consecutive-failure threshold; not selected until reset or cooled down
    Failed,
    /// Never reported; selectable
    Untested,
}

/// Proxy authentication. The password is never serialized or printed.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct ProxyCredentials {
    /// Basic auth user
    pub username: String,
    /// Basic auth password
    #[serde(skip_serializing)]
    pub password: String,
}

impl std::fmt::Debug for ProxyCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// An upstream proxy endpoint and its health counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Proxy {
    /// Hostname or IP address
    pub host: String,
    /// TCP port
    pub port: u16,
    /// Protocol spoken to the proxy
    pub protocol: ProxyProtocol,
    /// Optional basic auth
    pub credentials: Option<ProxyCredentials>,
    /// Exit country, informational only
    pub country: Option<String>,
    /// Attempts through this proxy classified OK
    pub success_count: u64,
    /// Attempts through this proxy that failed
    pub failure_count: u64,
    /// Failures since the last success (cleared by success or reset)
    pub consecutive_failures: u32,
    /// Running mean over all reported attempts
    pub average_latency_ms: f64,
    /// Wall-clock time of the last report
    pub last_used_at: Option<DateTime<Utc>>,
    /// Current health state
    pub status: ProxyStatus,
    #[serde(skip)]
    pub(crate) failed_at: Option<Instant>,
}

impl Proxy {
    /// A new, untested proxy without credentials.
    pub fn new(host: impl Into<String>, port: u16, protocol: ProxyProtocol) -> Self {
        Self {
            host: host.into(),
            port,
            protocol,
            credentials: None,
            country: None,
            success_count: 0,
            failure_count: 0,
            consecutive_failures: 0,
            average_latency_ms: 0.0,
            last_used_at: None,
            status: ProxyStatus::Untested,
            failed_at: None,
        }
    }

    /// Adds basic auth credentials.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(ProxyCredentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Tags the proxy with its exit country.
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// `scheme://host:port`, without credentials.
    pub fn endpoint(&self) -> String {
        format!("{}://{}:{}", self.protocol.scheme(), self.host, self.port)
    }

    /// Key identifying the network route, used to cache clients. Entries that differ
    /// only in credentials get distinct keys; the password enters as a hash.
    pub fn route_key(&self) -> String {
        match &self.credentials {
            Some(creds) => {
                let mut hasher = DefaultHasher::new();
                creds.password.hash(&mut hasher);
                format!("{}#{}#{:016x}", self.endpoint(), creds.username, hasher.finish())
            }
            None => self.endpoint(),
        }
    }

    /// success / (success + failure); 0.0 when never reported.
    pub fn success_rate(&self) -> f64 {
        let total = self.success_count + self.failure_count;
        if total == 0 {
            return 0.0;
        }
        self.success_count as f64 / total as f64
    }

    /// Active and untested proxies may be picked; failed ones may not.
    pub fn is_selectable(&self) -> bool {
        matches!(self.status, ProxyStatus::Active | ProxyStatus::Untested)
    }

    /// Converts to a `reqwest::Proxy` routing all schemes through this endpoint.
    pub fn to_reqwest_proxy(&self) -> Result<reqwest::Proxy, reqwest::Error> {
        let proxy = reqwest::Proxy::all(self.endpoint())?;
        Ok(match &self.credentials {
            Some(creds) => proxy.basic_auth(&creds.username, &creds.password),
            None => proxy,
        })
    }
}

impl std::fmt::Display for Proxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.endpoint())?;
        if let Some(country) = &self.country {
            write!(f, " [{}]", country)?;
        }
        Ok(())
    }
}

/// Result of one attempt routed through a proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyOutcome {
    /// The attempt was classified OK
    Success,
    /// Transport error, block, rate limit or transient status
    Failure,
}

/// Stable index of a proxy within its registry. Duplicated endpoints get distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ProxyId(pub(crate) usize);

impl ProxyId {
    /// Position in the registry, in insertion order.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A registry proxy as seen at selection time.
#[derive(Debug, Clone)]
pub struct ProxyHandle {
    /// Id to report the attempt's outcome against
    pub id: ProxyId,
    /// Copy of the proxy at selection time
    pub proxy: Proxy,
}

/// Aggregate registry snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProxyStats {
    /// Proxies in the registry
    pub total: usize,
    /// Proxies in the `Active` state
    pub active: usize,
    /// Proxies in the `Failed` state
    pub failed: usize,
    /// Proxies never reported
    pub untested: usize,
    /// Successes over all reported attempts, across every proxy
    pub success_rate: f64,
    /// Mean of per-proxy average latency over proxies with at least one report
    pub average_latency_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_and_route_key() {
        let proxy = Proxy::new("10.0.0.1", 8080, ProxyProtocol::Http);
        assert_eq!(proxy.endpoint(), "http://10.0.0.1:8080");
        assert_eq!(proxy.route_key(), "http://10.0.0.1:8080");

        let authed = proxy.clone().with_credentials("alice", "secret");
        assert!(authed.route_key().starts_with("http://10.0.0.1:8080#alice#"));
        assert!(!authed.route_key().contains("secret"));

        let rotated = proxy.with_credentials("alice", "other");
        assert_ne!(authed.route_key(), rotated.route_key());
    }

    #[test]
    fn test_credentials_are_not_leaked() {
        let proxy = Proxy::new("10.0.0.1", 1080, ProxyProtocol::Socks5).with_credentials("bob", "hunter2");
        let debug = format!("{:?}", proxy);
        assert!(!debug.contains("hunter2"));
        let json = serde_json::to_string(&proxy).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(json.contains("\"socks5\""));
    }

    #[test]
    fn test_success_rate() {
        let mut proxy = Proxy::new("h", 1, ProxyProtocol::Http);
        assert_eq!(proxy.success_rate(), 0.0);
        proxy.success_count = 3;
        proxy.failure_count = 1;
        assert_eq!(proxy.success_rate(), 0.75);
    }

    #[test]
    fn test_to_reqwest_proxy() {
        let proxy = Proxy::new("127.0.0.1", 3128, ProxyProtocol::Http).with_credentials("u", "p");
        assert!(proxy.to_reqwest_proxy().is_ok());
        let socks = Proxy::new("127.0.0.1", 1080, ProxyProtocol::Socks5);
        assert!(socks.to_reqwest_proxy().is_ok());
    }

    #[test]
    fn test_display_includes_country() {
        let proxy = Proxy::new("1.2.3.4", 80, ProxyProtocol::Http).with_country("PL");
        assert_eq!(proxy.to_string(), "http://1.2.3.4:80 [PL]");
    }

    #[test]
    fn test_protocol_from_scheme() {
        assert_eq!(ProxyProtocol::from_scheme("SOCKS5"), Some(ProxyProtocol::Socks5));
        assert_eq!(ProxyProtocol::from_scheme("http"), Some(ProxyProtocol::Http));
        assert_eq!(ProxyProtocol::from_scheme("ftp"), None);
    }
}
