//! Retry budget and exponential backoff.

use rand::Rng;
use std::time::Duration;

/// Upper bound (exclusive) of the random jitter added to each backoff.
const MAX_JITTER: Duration = Duration::from_millis(100);

/// How many attempts a request gets and how long to wait between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts: max_attempts.max(1) }
    }

    /// Whether another attempt follows the zero-based `attempt`.
    pub fn has_next(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts
    }

    /// Delay after the zero-based `attempt`: `2^attempt` seconds plus jitter in `[0, 100ms)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let jitter = rand::rng().random_range(0..MAX_JITTER.as_micros() as u64);
        Self::base_delay(attempt).saturating_add(Duration::from_micros(jitter))
    }

    fn base_delay(attempt: u32) -> Duration {
        Duration::from_secs(1u64.checked_shl(attempt).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_bounds() {
        let policy = RetryPolicy::default();
        for attempt in 0..6 {
            let floor = Duration::from_secs(2u64.pow(attempt));
            for _ in 0..20 {
                let delay = policy.backoff(attempt);
                assert!(delay >= floor, "attempt {attempt}: {delay:?} < {floor:?}");
                assert!(delay < floor + MAX_JITTER, "attempt {attempt}: {delay:?} too large");
            }
        }
    }

    #[test]
    fn test_backoff_grows() {
        let policy = RetryPolicy::default();
        assert!(policy.backoff(1) > policy.backoff(0));
        assert!(policy.backoff(2) > policy.backoff(1));
    }

    #[test]
    fn test_has_next() {
        let policy = RetryPolicy::new(3);
        assert!(policy.has_next(0));
        assert!(policy.has_next(1));
        assert!(!policy.has_next(2));
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(RetryPolicy::new(0).max_attempts, 1);
    }
}
