//! Bounded retry with exponential backoff for completion calls.

use std::time::Duration;

use warmpool_core::config::ReactorSettings;

/// How many times to call the fleet manager and how long to wait between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. At least 1.
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&ReactorSettings::default())
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &ReactorSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_backoff: settings.base_backoff,
            max_backoff: settings.max_backoff,
        }
    }

    /// Single attempt, no waiting.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    pub fn backoff(&self) -> Backoff {
        Backoff {
            current: self.base_backoff,
            max: self.max_backoff,
        }
    }
}

/// Doubling delay sequence, capped at the policy maximum.
#[derive(Debug)]
pub struct Backoff {
    current: Duration,
    max: Duration,
}

impl Backoff {
    /// Delay before the next attempt.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current.min(self.max);
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(base: u64, max: u64) -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_backoff: Duration::from_secs(base),
            max_backoff: Duration::from_secs(max),
        }
    }

    #[test]
    fn exponential_backoff() {
        let mut backoff = policy(1, 60).backoff();
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
        assert_eq!(backoff.next_delay(), Duration::from_secs(4));
        assert_eq!(backoff.next_delay(), Duration::from_secs(8));
    }

    #[test]
    fn backoff_caps_at_max() {
        let mut backoff = policy(1, 60).backoff();
        for _ in 0..10 {
            backoff.next_delay();
        }
        // 1 → 2 → 4 → 8 → 16 → 32 → 60 → 60 ...
        assert_eq!(backoff.next_delay(), Duration::from_secs(60));
    }

    #[test]
    fn base_above_max_is_clamped() {
        let mut backoff = policy(10, 3).backoff();
        assert_eq!(backoff.next_delay(), Duration::from_secs(3));
    }

    #[test]
    fn huge_backoff_saturates() {
        let mut backoff = RetryPolicy {
            max_attempts: 3,
            base_backoff: Duration::MAX,
            max_backoff: Duration::MAX,
        }
        .backoff();
        assert_eq!(backoff.next_delay(), Duration::MAX);
        assert_eq!(backoff.next_delay(), Duration::MAX);
    }

    #[test]
    fn settings_clamp_attempts() {
        let settings = ReactorSettings {
            max_attempts: 0,
            ..ReactorSettings::default()
        };
        assert_eq!(RetryPolicy::from_settings(&settings).max_attempts, 1);
    }

    #[test]
    fn defaults_follow_settings() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_backoff, Duration::from_millis(200));
        assert_eq!(policy.max_backoff, Duration::from_secs(5));
    }
}
