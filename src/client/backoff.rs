//! Retry policy and the escalating delay shared by one client's pulls.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Default number of extra pull attempts.
pub const DEFAULT_PULL_RETRIES: u32 = 0;

/// Default delay before the first retry.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// How many times a failed pull is retried and how long to wait first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub retries: u32,
    /// Delay slept after the first failure.
    pub initial_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy.
    #[must_use]
    pub const fn new(retries: u32, initial_delay: Duration) -> Self {
        Self {
            retries,
            initial_delay,
        }
    }

    /// Total attempts a pull makes before giving up.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_PULL_RETRIES, DEFAULT_RETRY_DELAY)
    }
}

/// Escalating retry delay.
///
/// Every failed attempt takes the current delay and doubles it for the next
/// one. The delay is never reset, so repeated failures across separate pulls
/// through the same client keep backing off further.
#[derive(Debug)]
pub struct Backoff {
    delay: Mutex<Duration>,
}

impl Backoff {
    /// Start with `initial` as the first delay.
    #[must_use]
    pub const fn new(initial: Duration) -> Self {
        Self {
            delay: Mutex::new(initial),
        }
    }

    /// The delay the next failed attempt will sleep for.
    #[must_use]
    pub fn current(&self) -> Duration {
        *self.delay.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the delay to sleep now and double the stored one.
    ///
    /// The read and the update happen under one lock.
    pub fn escalate(&self) -> Duration {
        let mut delay = self.delay.lock().unwrap_or_else(PoisonError::into_inner);
        let current = *delay;
        *delay = current.checked_mul(2).unwrap_or(Duration::MAX);
        current
    }
}
