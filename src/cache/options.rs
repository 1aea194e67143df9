use std::time::Duration;

/// Upper bound for a single retry backoff
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Per-key cache policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// Age after which a value is served but refreshed in the background
    pub stale_after: Duration,
    /// Idle time after which an unobserved entry is dropped
    pub evict_after: Duration,
    /// Retries after the first failed attempt
    pub max_retries: u32,
    /// First backoff step; doubles on every further failure
    pub retry_delay: Duration,
}

impl QueryOptions {
    pub fn new(stale_after: Duration, evict_after: Duration) -> Self {
        Self {
            stale_after,
            evict_after,
            ..Self::default()
        }
    }

    pub fn with_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Delay before retry number `attempt` (0-based), capped at 30s
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.retry_delay
            .checked_mul(factor)
            .unwrap_or(MAX_RETRY_DELAY)
            .min(MAX_RETRY_DELAY)
    }
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            stale_after: Duration::ZERO,
            evict_after: Duration::from_secs(5 * 60),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}
