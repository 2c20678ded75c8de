//! Deadline and cancellation for one logical fetch.

use std::future::{pending, Future};

use tokio::time::{sleep_until, Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Why a suspension point was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Interrupted {
    DeadlineExceeded,
    Cancelled,
}

impl Interrupted {
    pub(crate) fn describe(&self) -> &'static str {
        match self {
            Interrupted::DeadlineExceeded => "deadline exceeded",
            Interrupted::Cancelled => "cancelled",
        }
    }
}

/// Races every await of a fetch against its deadline and cancellation token.
#[derive(Debug, Clone, Default)]
pub(crate) struct Interrupt {
    deadline: Option<Instant>,
    cancel: Option<CancellationToken>,
}

impl Interrupt {
    pub(crate) fn new(timeout: Option<Duration>, cancel: Option<CancellationToken>) -> Self {
        Self {
            deadline: timeout.map(|t| Instant::now() + t),
            cancel,
        }
    }

    /// Checks without waiting.
    pub(crate) fn check(&self) -> Result<(), Interrupted> {
        if self.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
            return Err(Interrupted::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(Interrupted::DeadlineExceeded);
        }
        Ok(())
    }

    /// Runs `fut` unless the deadline passes or the token is cancelled first.
    pub(crate) async fn guard<F: Future>(&self, fut: F) -> Result<F::Output, Interrupted> {
        let deadline = async {
            match self.deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };
        let cancelled = async {
            match &self.cancel {
                Some(token) => token.cancelled().await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => Err(Interrupted::Cancelled),
            _ = deadline => Err(Interrupted::DeadlineExceeded),
            output = fut => Ok(output),
        }
    }
}
