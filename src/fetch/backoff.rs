//! Retry backoff schedule.
//!
//! After the n-th failed attempt the orchestrator waits `base * 2^n`, capped at the
//! configured ceiling. Rate-limited attempts scale that delay by the rate-limit
//! multiplier, and a `Retry-After` header can raise it further (still capped).

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use tokio_retry::strategy::ExponentialBackoff;

use crate::classify::Classification;
use crate::config::FetchConfig;

#[derive(Debug, Clone)]
pub(crate) struct BackoffPolicy {
    base: Duration,
    max: Duration,
    rate_limit_multiplier: f64,
}

impl BackoffPolicy {
    pub(crate) fn new(base: Duration, max: Duration, rate_limit_multiplier: f64) -> Self {
        Self {
            base,
            max: max.max(base),
            rate_limit_multiplier: if rate_limit_multiplier.is_finite() {
                rate_limit_multiplier.max(1.0)
            } else {
                1.0
            },
        }
    }

    pub(crate) fn from_config(config: &FetchConfig) -> Self {
        Self::new(
            config.backoff_base_delay,
            config.backoff_max_delay,
            config.rate_limit_backoff_multiplier,
        )
    }

    /// Per-fetch schedule yielding `base * 2^1`, `base * 2^2`, ...
    pub(crate) fn schedule(&self) -> ExponentialBackoff {
        ExponentialBackoff::from_millis(2)
            .factor(self.base.as_millis() as u64)
            .max_delay(self.max)
    }

    /// Delay to wait before the next attempt.
    ///
    /// `scheduled` is the next value of [`schedule`](Self::schedule).
    pub(crate) fn delay(
        &self,
        scheduled: Duration,
        classification: Classification,
        retry_after: Option<Duration>,
    ) -> Duration {
        let mut delay = scheduled.min(self.max);
        if classification == Classification::RateLimited {
            delay = delay.mul_f64(self.rate_limit_multiplier);
        }
        if let Some(retry_after) = retry_after {
            delay = delay.max(retry_after);
        }
        delay.min(self.max)
    }

    pub(crate) fn max(&self) -> Duration {
        self.max
    }
}

/// Reads a `Retry-After` header expressed in seconds. HTTP-date values are ignored.
pub(crate) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_schedule_doubles_from_twice_base() {
        let policy = BackoffPolicy::new(ms(1000), Duration::from_secs(60), 2.0);
        let delays: Vec<Duration> = policy.schedule().take(4).collect();
        assert_eq!(delays, vec![ms(2000), ms(4000), ms(8000), ms(16000)]);
    }

    #[test]
    fn test_schedule_is_capped() {
        let policy = BackoffPolicy::new(ms(1000), ms(5000), 2.0);
        let delays: Vec<Duration> = policy.schedule().take(4).collect();
        assert_eq!(delays, vec![ms(2000), ms(4000), ms(5000), ms(5000)]);
    }

    #[test]
    fn test_rate_limited_uses_multiplier() {
        let policy = BackoffPolicy::new(ms(1000), Duration::from_secs(60), 2.0);
        assert_eq!(
            policy.delay(ms(2000), Classification::RateLimited, None),
            ms(4000)
        );
        assert_eq!(policy.delay(ms(2000), Classification::Blocked, None), ms(2000));
    }

    #[test]
    fn test_multiplied_delay_still_capped() {
        let policy = BackoffPolicy::new(ms(1000), ms(3000), 4.0);
        assert_eq!(
            policy.delay(ms(2000), Classification::RateLimited, None),
            ms(3000)
        );
    }

    #[test]
    fn test_retry_after_raises_delay() {
        let policy = BackoffPolicy::new(ms(1000), Duration::from_secs(60), 2.0);
        assert_eq!(
            policy.delay(ms(2000), Classification::Blocked, Some(Duration::from_secs(7))),
            Duration::from_secs(7)
        );
        // Never lowers it
        assert_eq!(
            policy.delay(ms(2000), Classification::Blocked, Some(Duration::from_secs(1))),
            ms(2000)
        );
        // Capped
        assert_eq!(
            policy.delay(ms(2000), Classification::Blocked, Some(Duration::from_secs(3600))),
            Duration::from_secs(60)
        );
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);
        headers.insert(RETRY_AFTER, HeaderValue::from_static("120"));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(120)));
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(retry_after(&headers), None);
    }

    #[test]
    fn test_multiplier_below_one_is_clamped() {
        let policy = BackoffPolicy::new(ms(100), ms(10_000), 0.1);
        assert_eq!(policy.delay(ms(200), Classification::RateLimited, None), ms(200));
    }
}
