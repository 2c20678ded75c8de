//! Rotating request identities.
//!
//! An [`Identity`] is a simulated client fingerprint: a User-Agent plus the ordered
//! header set that browser sends. The [`IdentityPool`] hands them out so that two
//! consecutive attempts never reuse the same fingerprint (when more than one is
//! available).
//!
//! The pool is pure data plus a selection policy; it performs no I/O and never fails.

mod profiles;

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;
use serde::Serialize;

use crate::config::{FetchConfig, IdentitySelection};

pub use profiles::{default_profiles, BrowserFamily};

/// Ordered list of header name/value pairs sent with every request of an identity.
pub type HeaderTemplate = Vec<(String, String)>;

/// Simulated screen size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Viewport {
    /// Pixels across
    pub width: u32,
    /// Pixels down
    pub height: u32,
}

/// A simulated client fingerprint. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Short name used in logs and as the session fingerprint
    pub label: String,
    /// User-Agent header value
    pub user_agent: String,
    /// Navigation headers, in send order (User-Agent excluded)
    pub headers: HeaderTemplate,
    /// Platform reported by client hints
    pub platform: Option<String>,
    /// Simulated viewport
    pub viewport: Option<Viewport>,
}

impl Identity {
    /// Builds an identity from a User-Agent alone, inferring the header template.
    pub fn from_user_agent(user_agent: impl Into<String>) -> Self {
        let user_agent = user_agent.into();
        let label = format!("custom-{}", profiles_label(&user_agent));
        profiles::identity_for_user_agent(label, user_agent)
    }

    /// Case-insensitive header lookup within the template.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn profiles_label(user_agent: &str) -> &'static str {
    match BrowserFamily::detect(user_agent) {
        BrowserFamily::Chrome => "chrome",
        BrowserFamily::Edge => "edge",
        BrowserFamily::Firefox => "firefox",
        BrowserFamily::Safari => "safari",
    }
}

/// Sentinel stored in `last` before any identity was handed out
const NONE_SELECTED: usize = usize::MAX;

/// Process-wide pool of identities with a rotation policy.
#[derive(Debug)]
pub struct IdentityPool {
    identities: Vec<Identity>,
    selection: IdentitySelection,
    cursor: AtomicUsize,
    last: AtomicUsize,
}

impl IdentityPool {
    /// Creates a pool from explicit identities. An empty list falls back to the
    /// built-in desktop profiles.
    pub fn new(identities: Vec<Identity>, selection: IdentitySelection) -> Self {
        let identities = if identities.is_empty() {
            default_profiles()
        } else {
            identities
        };
        // Random start so separate processes do not open with the same fingerprint
        let start = rand::rng().random_range(0..identities.len());
        Self {
            identities,
            selection,
            cursor: AtomicUsize::new(start),
            last: AtomicUsize::new(NONE_SELECTED),
        }
    }

    /// Creates a pool from candidate User-Agent strings and header templates.
    ///
    /// - both empty: built-in profiles
    /// - user agents only: each paired with the template of its browser family
    /// - templates given: identities cycle through the templates
    pub fn from_candidates(
        user_agents: Vec<String>,
        header_templates: Vec<HeaderTemplate>,
        selection: IdentitySelection,
    ) -> Self {
        let mut identities: Vec<Identity> = if user_agents.is_empty() {
            default_profiles()
        } else {
            user_agents
                .into_iter()
                .filter(|ua| !ua.trim().is_empty())
                .enumerate()
                .map(|(i, ua)| {
                    let mut identity = Identity::from_user_agent(ua.trim().to_string());
                    identity.label = format!("{}-{}", identity.label, i);
                    identity
                })
                .collect()
        };

        if !header_templates.is_empty() {
            for (i, identity) in identities.iter_mut().enumerate() {
                identity.headers = header_templates[i % header_templates.len()].clone();
            }
        }

        Self::new(identities, selection)
    }

    /// Pool built from `config.user_agents`, or the built-in profiles when empty.
    pub fn from_config(config: &FetchConfig) -> Self {
        Self::from_candidates(
            config.user_agents.clone(),
            Vec::new(),
            config.identity_selection,
        )
    }

    /// Returns the next identity according to the selection policy.
    ///
    /// With more than one identity, the returned identity always differs from the
    /// one returned by the previous call.
    pub fn next(&self) -> Identity {
        let len = self.identities.len();
        let index = match self.selection {
            IdentitySelection::RoundRobin => self.cursor.fetch_add(1, Ordering::Relaxed) % len,
            IdentitySelection::Random => {
                let last = self.last.load(Ordering::Relaxed);
                let mut rng = rand::rng();
                if len > 1 && last < len {
                    // Pick among the other len-1 identities
                    (last + 1 + rng.random_range(0..len - 1)) % len
                } else {
                    rng.random_range(0..len)
                }
            }
        };
        self.last.store(index, Ordering::Relaxed);
        self.identities[index].clone()
    }

    /// Number of identities in rotation.
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    /// Always false for a pool built by `new` or `from_config`.
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// The identities in rotation order.
    pub fn identities(&self) -> &[Identity] {
        &self.identities
    }
}

impl Default for IdentityPool {
    fn default() -> Self {
        Self::new(Vec::new(), IdentitySelection::default())
    }
}
