//! Retry policy for durable runs.

use std::time::Duration;

/// Bounds on how a run retries its attempts.
///
/// `max_attempts` counts every attempt, including the first.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_interval: Duration,
    /// Multiplier applied to the delay after each further failure.
    pub backoff_coefficient: f64,
    /// Upper bound on a single delay.
    pub max_interval: Option<Duration>,
    /// Wall-clock bound on the whole run, across all attempts.
    pub start_to_close_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_interval: Duration::from_secs(1),
            backoff_coefficient: 2.0,
            max_interval: None,
            start_to_close_timeout: Duration::from_secs(300), // 5 minutes
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after `attempt` (1-indexed) failed, before the next one.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exp = self.backoff_coefficient.max(1.0).powi((attempt - 1) as i32);
        let delay_secs = self.initial_interval.as_secs_f64() * exp;
        let delay = Duration::try_from_secs_f64(delay_secs).unwrap_or(Duration::MAX);

        match self.max_interval {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }

    /// Whether another attempt may follow a retryable failure of `attempt`.
    pub fn has_attempts_after(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_run_contract() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_interval, Duration::from_secs(1));
        assert_eq!(policy.start_to_close_timeout, Duration::from_secs(300));
    }

    #[test]
    fn exponential_delays() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(0), Duration::ZERO);
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
    }

    #[test]
    fn delay_is_capped() {
        let policy = RetryPolicy {
            max_interval: Some(Duration::from_millis(1500)),
            ..Default::default()
        };
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_millis(1500));
        assert_eq!(policy.delay_after(10), Duration::from_millis(1500));
    }

    #[test]
    fn coefficient_below_one_does_not_shrink() {
        let policy = RetryPolicy {
            backoff_coefficient: 0.5,
            ..Default::default()
        };
        assert_eq!(policy.delay_after(3), Duration::from_secs(1));
    }

    #[test]
    fn attempts_remaining() {
        let policy = RetryPolicy::default();
        assert!(policy.has_attempts_after(1));
        assert!(policy.has_attempts_after(2));
        assert!(!policy.has_attempts_after(3));
        let single = RetryPolicy {
            max_attempts: 1,
            ..Default::default()
        };
        assert!(!single.has_attempts_after(1));
    }
}
