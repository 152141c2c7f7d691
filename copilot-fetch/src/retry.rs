//! Retry policy for HTTP requests.

use std::time::Duration;

/// Status codes that are worth retrying.
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Default retry count.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Delay unit: retry `k` waits `k` times this long.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1500);

/// Strategy for retrying failed requests.
///
/// A policy with `max_retries = N` makes up to `N + 1` attempts. The delay
/// before retry `k` (1-based) is `base_delay * k`, so the default schedule is
/// 1.5 s, 3.0 s, 4.5 s, ...
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Linear backoff unit.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy with the default backoff unit.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }

    /// Disables retries.
    pub fn no_retry() -> Self {
        Self::new(0)
    }

    /// Sets the backoff unit.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Total number of attempts, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay to wait after failed attempt `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Whether a response status is retryable at all.
    pub fn is_retryable_status(status: u16) -> bool {
        RETRYABLE_STATUSES.contains(&status)
    }

    /// Whether attempt `attempt` (1-based) failing with `status` should be retried.
    pub fn should_retry(&self, status: u16, attempt: u32) -> bool {
        Self::is_retryable_status(status) && attempt < self.max_attempts()
    }

    /// Every delay this policy can produce, in order.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..=self.max_retries)
            .map(|attempt| self.delay_for_attempt(attempt))
            .collect()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}
