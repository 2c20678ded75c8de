//! Built-in browser profiles.
//!
//! Each profile pairs a realistic desktop User-Agent with the header set that
//! browser actually sends on a top-level navigation, in the order it sends them.

use super::{HeaderTemplate, Identity, Viewport};

/// Chrome major version used in the built-in profiles
const CHROME_VERSION: &str = "131.0.0.0";

/// Firefox version used in the built-in profiles
const FIREFOX_VERSION: &str = "133.0";

/// Browser family inferred from a User-Agent string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserFamily {
    /// Chromium-based, Client Hints included
    Chrome,
    /// Chromium-based, `Edg/` token
    Edge,
    /// Gecko
    Firefox,
    /// WebKit on macOS
    Safari,
}

impl BrowserFamily {
    /// Infers the family from a User-Agent string. Unknown strings are treated as Chrome,
    /// the most common desktop engine.
    pub fn detect(user_agent: &str) -> Self {
        if user_agent.contains("Edg/") {
            BrowserFamily::Edge
        } else if user_agent.contains("Firefox/") {
            BrowserFamily::Firefox
        } else if user_agent.contains("Chrome/") || user_agent.contains("Chromium/") {
            BrowserFamily::Chrome
        } else if user_agent.contains("Safari/") {
            BrowserFamily::Safari
        } else {
            BrowserFamily::Chrome
        }
    }

    /// Default navigation header template for this family.
    pub fn header_template(&self, platform: &str) -> HeaderTemplate {
        match self {
            BrowserFamily::Chrome | BrowserFamily::Edge => {
                let brand = if *self == BrowserFamily::Edge {
                    "\"Microsoft Edge\";v=\"131\", \"Chromium\";v=\"131\", \"Not_A Brand\";v=\"24\""
                } else {
                    "\"Google Chrome\";v=\"131\", \"Chromium\";v=\"131\", \"Not_A Brand\";v=\"24\""
                };
                vec![
                    ("sec-ch-ua".into(), brand.into()),
                    ("sec-ch-ua-mobile".into(), "?0".into()),
                    ("sec-ch-ua-platform".into(), format!("\"{platform}\"")),
                    ("Upgrade-Insecure-Requests".into(), "1".into()),
                    (
                        "Accept".into(),
                        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7".into(),
                    ),
                    ("Sec-Fetch-Site".into(), "none".into()),
                    ("Sec-Fetch-Mode".into(), "navigate".into()),
                    ("Sec-Fetch-User".into(), "?1".into()),
                    ("Sec-Fetch-Dest".into(), "document".into()),
                    ("Accept-Language".into(), "en-US,en;q=0.9".into()),
                ]
            }
            BrowserFamily::Firefox => vec![
                (
                    "Accept".into(),
                    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".into(),
                ),
                ("Accept-Language".into(), "en-US,en;q=0.5".into()),
                ("Upgrade-Insecure-Requests".into(), "1".into()),
                ("Sec-Fetch-Dest".into(), "document".into()),
                ("Sec-Fetch-Mode".into(), "navigate".into()),
                ("Sec-Fetch-Site".into(), "none".into()),
                ("Sec-Fetch-User".into(), "?1".into()),
                ("Priority".into(), "u=0, i".into()),
            ],
            BrowserFamily::Safari => vec![
                (
                    "Accept".into(),
                    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".into(),
                ),
                ("Sec-Fetch-Site".into(), "none".into()),
                ("Sec-Fetch-Mode".into(), "navigate".into()),
                ("Sec-Fetch-Dest".into(), "document".into()),
                ("Accept-Language".into(), "en-US,en;q=0.9".into()),
            ],
        }
    }
}

/// Infers the platform name reported by client hints from a User-Agent string.
pub fn detect_platform(user_agent: &str) -> &'static str {
    if user_agent.contains("Windows") {
        "Windows"
    } else if user_agent.contains("Macintosh") || user_agent.contains("Mac OS X") {
        "macOS"
    } else if user_agent.contains("Linux") || user_agent.contains("X11") {
        "Linux"
    } else {
        "Windows"
    }
}

/// Generates a Chrome User-Agent string for the given OS token and version.
pub fn generate_chrome_user_agent(os_token: &str, chrome_version: &str) -> String {
    format!(
        "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{} Safari/537.36",
        os_token, chrome_version
    )
}

fn generate_firefox_user_agent(os_token: &str, firefox_version: &str) -> String {
    format!(
        "Mozilla/5.0 ({}; rv:{}) Gecko/20100101 Firefox/{}",
        os_token, firefox_version, firefox_version
    )
}

/// Builds an identity from a bare User-Agent, inferring family, platform and headers.
pub fn identity_for_user_agent(label: String, user_agent: String) -> Identity {
    let family = BrowserFamily::detect(&user_agent);
    let platform = detect_platform(&user_agent);
    Identity {
        label,
        headers: family.header_template(platform),
        platform: Some(platform.to_string()),
        viewport: None,
        user_agent,
    }
}

/// The built-in desktop profiles used when no candidates are configured.
pub fn default_profiles() -> Vec<Identity> {
    const WINDOWS: &str = "Windows NT 10.0; Win64; x64";
    const MACOS: &str = "Macintosh; Intel Mac OS X 10_15_7";
    const MACOS_FIREFOX: &str = "Macintosh; Intel Mac OS X 10.15";
    const LINUX: &str = "X11; Linux x86_64";

    let profile = |label: &str, user_agent: String, width: u32, height: u32| {
        let mut identity = identity_for_user_agent(label.to_string(), user_agent);
        identity.viewport = Some(Viewport { width, height });
        identity
    };

    vec![
        profile(
            "chrome-windows",
            generate_chrome_user_agent(WINDOWS, CHROME_VERSION),
            1920,
            1080,
        ),
        profile(
            "chrome-macos",
            generate_chrome_user_agent(MACOS, CHROME_VERSION),
            1440,
            900,
        ),
        profile(
            "chrome-linux",
            generate_chrome_user_agent(LINUX, CHROME_VERSION),
            1366,
            768,
        ),
        profile(
            "edge-windows",
            format!(
                "{} Edg/{}",
                generate_chrome_user_agent(WINDOWS, CHROME_VERSION),
                CHROME_VERSION
            ),
            1536,
            864,
        ),
        profile(
            "firefox-windows",
            generate_firefox_user_agent(WINDOWS, FIREFOX_VERSION),
            1920,
            1080,
        ),
        profile(
            "firefox-macos",
            generate_firefox_user_agent(MACOS_FIREFOX, FIREFOX_VERSION),
            1680,
            1050,
        ),
        profile(
            "safari-macos",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Safari/605.1.15".to_string(),
            1512,
            982,
        ),
    ]
}
