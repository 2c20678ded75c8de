// Shared test helpers for orchestrator configuration and proxy fixtures.
//
// This module provides common utilities used across multiple test files to reduce duplication.

use std::time::Duration;

use adaptive_fetch::{FetchConfig, Proxy, ProxyProtocol};

/// Configuration without pacing and with millisecond backoff so retry tests stay fast.
#[allow(dead_code)] // Used by other test files
pub fn fast_config() -> FetchConfig {
    FetchConfig {
        pacing_enabled: false,
        backoff_base_delay: Duration::from_millis(1),
        backoff_max_delay: Duration::from_millis(20),
        request_timeout: Duration::from_secs(10),
        connect_timeout: Duration::from_secs(2),
        use_proxies: false,
        ..Default::default()
    }
}

/// A proxy on a port nothing listens on; every connection through it is refused.
#[allow(dead_code)]
pub fn dead_proxy() -> Proxy {
    Proxy::new("127.0.0.1", 1, ProxyProtocol::Http)
}

/// Routes through a mock server acting as a plain HTTP forward proxy. The server
/// sees absolute-form requests and answers them itself.
#[allow(dead_code)]
pub fn proxy_via(server: &wiremock::MockServer) -> Proxy {
    Proxy::new("127.0.0.1", server.address().port(), ProxyProtocol::Http)
}
