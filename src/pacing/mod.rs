//! Human-cadence request pacing.
//!
//! [`RatePacer::wait_for_slot`] suspends the caller until the next request may be
//! issued:
//!
//! - a random delay in `[min_delay, max_delay]`, measured from the completion of the
//!   previous request (no wait if that much time already passed)
//! - after `max_pages_per_session` slots, a `session_break_duration` pause, after
//!   which the page counter starts over
//!
//! The pacer's state sits behind a tokio mutex held across the wait, so concurrent
//! callers are served one after another.

use log::{debug, info};
use rand::Rng;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

use crate::config::FetchConfig;

/// Pacing parameters.
#[derive(Debug, Clone)]
pub struct PacingConfig {
    /// Lower bound of the gap between two requests
    pub min_delay: Duration,
    /// Upper bound of the gap between two requests
    pub max_delay: Duration,
    /// Slots granted before a session break
    pub max_pages_per_session: u32,
    /// Pause taken between sessions
    pub session_break_duration: Duration,
    /// When false, slots are granted immediately; pages are still counted
    pub enabled: bool,
}

impl From<&FetchConfig> for PacingConfig {
    fn from(config: &FetchConfig) -> Self {
        Self {
            min_delay: config.min_delay.min(config.max_delay),
            max_delay: config.max_delay.max(config.min_delay),
            max_pages_per_session: config.max_pages_per_session.max(1),
            session_break_duration: config.session_break_duration,
            enabled: config.pacing_enabled,
        }
    }
}

/// What happened while waiting for a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotGrant {
    /// Total time spent suspended, session break included
    pub waited: Duration,
    /// This slot is the first of a session
    pub new_session: bool,
    /// A session break pause was taken before this slot
    pub session_break: bool,
    /// 1-based position of this slot within its session
    pub page_in_session: u32,
}

#[derive(Debug, Default)]
struct PacerState {
    last_request: Option<Instant>,
    pages_in_session: u32,
}

/// Enforces randomized spacing between requests and periodic session breaks.
#[derive(Debug)]
pub struct RatePacer {
    config: PacingConfig,
    state: Mutex<PacerState>,
}

impl RatePacer {
    /// A pacer whose first slot is granted without delay.
    pub fn new(config: PacingConfig) -> Self {
        Self {
            config,
            state: Mutex::new(PacerState::default()),
        }
    }

    /// The delays and session limits in effect.
    pub fn config(&self) -> &PacingConfig {
        &self.config
    }

    /// Suspends until a request may proceed.
    pub async fn wait_for_slot(&self) -> SlotGrant {
        let mut state = self.state.lock().await;
        let started = Instant::now();
        let mut session_break = false;

        if state.pages_in_session >= self.config.max_pages_per_session {
            if self.config.enabled && !self.config.session_break_duration.is_zero() {
                info!(
                    "Session limit of {} pages reached, pausing for {:?}",
                    self.config.max_pages_per_session, self.config.session_break_duration
                );
                sleep(self.config.session_break_duration).await;
                session_break = true;
            }
            state.pages_in_session = 0;
        }

        if self.config.enabled {
            if let Some(last) = state.last_request {
                let target = self.random_delay();
                let elapsed = last.elapsed();
                if elapsed < target {
                    let remaining = target - elapsed;
                    debug!("Pacing: waiting {:?} before next request", remaining);
                    sleep(remaining).await;
                }
            }
        }

        let new_session = state.pages_in_session == 0;
        state.pages_in_session += 1;
        state.last_request = Some(Instant::now());

        SlotGrant {
            waited: started.elapsed(),
            new_session,
            session_break,
            page_in_session: state.pages_in_session,
        }
    }

    /// Records that the request granted by the last slot has completed.
    pub async fn mark_complete(&self) {
        self.state.lock().await.last_request = Some(Instant::now());
    }

    /// Slots granted in the current session.
    pub async fn pages_in_session(&self) -> u32 {
        self.state.lock().await.pages_in_session
    }

    fn random_delay(&self) -> Duration {
        let min = self.config.min_delay.as_millis() as u64;
        let max = self.config.max_delay.as_millis() as u64;
        if max <= min {
            return Duration::from_millis(min);
        }
        Duration::from_millis(rand::rng().random_range(min..=max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pacer(min_ms: u64, max_ms: u64, pages: u32, break_ms: u64) -> RatePacer {
        RatePacer::new(PacingConfig {
            min_delay: Duration::from_millis(min_ms),
            max_delay: Duration::from_millis(max_ms),
            max_pages_per_session: pages,
            session_break_duration: Duration::from_millis(break_ms),
            enabled: true,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_slot_is_immediate() {
        let pacer = pacer(3000, 5000, 2, 600_000);
        let grant = pacer.wait_for_slot().await;
        assert_eq!(grant.waited, Duration::ZERO);
        assert!(grant.new_session);
        assert!(!grant.session_break);
        assert_eq!(grant.page_in_session, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_slot_waits_at_least_min_delay() {
        let pacer = pacer(3000, 5000, 5, 600_000);
        pacer.wait_for_slot().await;
        pacer.mark_complete().await;

        let start = Instant::now();
        let grant = pacer.wait_for_slot().await;
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(3000), "waited {:?}", waited);
        assert!(waited <= Duration::from_millis(5001), "waited {:?}", waited);
        assert!(!grant.new_session);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_when_enough_time_elapsed() {
        let pacer = pacer(3000, 3000, 5, 600_000);
        pacer.wait_for_slot().await;
        pacer.mark_complete().await;
        sleep(Duration::from_secs(10)).await;

        let grant = pacer.wait_for_slot().await;
        assert_eq!(grant.waited, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_break_after_max_pages() {
        let pacer = pacer(3000, 3000, 2, 600_000);
        pacer.wait_for_slot().await;
        pacer.mark_complete().await;
        pacer.wait_for_slot().await;
        pacer.mark_complete().await;

        let start = Instant::now();
        let grant = pacer.wait_for_slot().await;
        assert!(start.elapsed() >= Duration::from_millis(600_000));
        assert!(grant.session_break);
        assert!(grant.new_session);
        assert_eq!(grant.page_in_session, 1);
        assert_eq!(pacer.pages_in_session().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_pacer_never_waits() {
        let pacer = RatePacer::new(PacingConfig {
            enabled: false,
            ..PacingConfig::from(&FetchConfig::default())
        });
        for i in 0..5u32 {
            let grant = pacer.wait_for_slot().await;
            assert_eq!(grant.waited, Duration::ZERO);
            assert!(!grant.session_break);
            // Sessions still rotate so proxy selection can follow them
            assert_eq!(grant.new_session, i % 2 == 0);
        }
    }

    #[test]
    fn test_pacing_config_from_fetch_config() {
        let config = FetchConfig {
            min_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(100),
            max_pages_per_session: 0,
            ..Default::default()
        };
        let pacing = PacingConfig::from(&config);
        assert_eq!(pacing.min_delay, Duration::from_millis(100));
        assert_eq!(pacing.max_delay, Duration::from_millis(500));
        assert_eq!(pacing.max_pages_per_session, 1);
    }
}
