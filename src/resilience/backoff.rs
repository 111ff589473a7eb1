//! Exponential backoff with optional jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::schema::RetryConfig;

/// Backoff schedule for the retry executor.
///
/// With `jitter_ratio == 0.0` the schedule is non-decreasing and never
/// exceeds `max`.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub multiplier: f64,
    pub max: Duration,
    /// Extra random delay, as a fraction of the computed delay (0.0 disables).
    pub jitter_ratio: f64,
}

impl BackoffPolicy {
    /// Delay to wait before retry number `retry` (1-based).
    pub fn delay(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(retry - 1).unwrap_or(i32::MAX);
        let max_secs = self.max.as_secs_f64();
        let delay_secs = (self.initial.as_secs_f64() * self.multiplier.powi(exponent)).min(max_secs);

        let jitter_range = delay_secs * self.jitter_ratio;
        let jitter = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(0.0..jitter_range)
        } else {
            0.0
        };

        let total = (delay_secs + jitter).min(max_secs);
        if total.is_finite() && total > 0.0 {
            Duration::from_secs_f64(total)
        } else {
            Duration::ZERO
        }
    }

    /// The first `retries` delays, in order.
    pub fn schedule(&self, retries: u32) -> Vec<Duration> {
        (1..=retries).map(|retry| self.delay(retry)).collect()
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            multiplier: 2.0,
            max: Duration::from_secs(10),
            jitter_ratio: 0.0,
        }
    }
}

impl From<&RetryConfig> for BackoffPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            initial: Duration::from_millis(config.initial_backoff_ms),
            multiplier: config.backoff_multiplier,
            max: Duration::from_millis(config.max_backoff_ms),
            jitter_ratio: config.jitter_ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay(0), Duration::ZERO);
        assert_eq!(policy.delay(1), Duration::from_secs(1));
        assert_eq!(policy.delay(2), Duration::from_secs(2));
        assert_eq!(policy.delay(3), Duration::from_secs(4));
        assert_eq!(policy.delay(4), Duration::from_secs(8));
        assert_eq!(policy.delay(5), Duration::from_secs(10));
        assert_eq!(policy.delay(40), Duration::from_secs(10));
    }

    #[test]
    fn test_schedule_monotonic_and_capped() {
        let policy = BackoffPolicy {
            initial: Duration::from_millis(300),
            multiplier: 3.0,
            max: Duration::from_secs(5),
            jitter_ratio: 0.0,
        };
        let schedule = policy.schedule(12);
        assert!(schedule.windows(2).all(|w| w[0] <= w[1]));
        assert!(schedule.iter().all(|d| *d <= policy.max));
    }

    #[test]
    fn test_jitter_never_exceeds_max() {
        let policy = BackoffPolicy {
            jitter_ratio: 0.5,
            ..BackoffPolicy::default()
        };
        for retry in 1..20 {
            let delay = policy.delay(retry);
            assert!(delay <= policy.max);
            assert!(delay >= BackoffPolicy::default().delay(retry));
        }
    }
}
