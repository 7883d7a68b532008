//! Bounded fixed-delay reconnection policy.
//!
//! Shared by the [`relay`](crate::relay) (towards the GPS source) and the
//! [`FeedListener`](crate::live_feed::FeedListener) (towards the relay). Both
//! call [`ReconnectState::next_delay`] from their close/error path and stop
//! retrying once it returns `None`.
//!
//! ```
//! use std::time::Duration;
//! use sealane::reconnect::ReconnectPolicy;
//!
//! let mut state = ReconnectPolicy::new(3, Duration::from_secs(5)).tracker();
//! assert_eq!(state.next_delay(), Some(Duration::from_secs(5)));
//! assert_eq!(state.next_delay(), Some(Duration::from_secs(5)));
//! assert_eq!(state.next_delay(), Some(Duration::from_secs(5)));
//! assert_eq!(state.next_delay(), None);
//! ```

use std::time::Duration;

/// Default number of automatic reconnection attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before each reconnection attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// How many times to retry a dropped connection, and how long to wait first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Consecutive failures that still schedule a retry.
    pub max_attempts: u32,

    /// Fixed wait before each retry.
    pub delay: Duration,
}

impl ReconnectPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Start tracking attempts against this policy.
    pub fn tracker(&self) -> ReconnectState {
        ReconnectState {
            policy: *self,
            attempts: 0,
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_RECONNECT_DELAY)
    }
}

/// Attempt counter for one connection owner.
#[derive(Debug, Clone)]
pub struct ReconnectState {
    policy: ReconnectPolicy,
    attempts: u32,
}

impl ReconnectState {
    /// Record a failure and return the delay before the next attempt.
    ///
    /// Returns `None` once `max_attempts` retries have been scheduled since
    /// the last [`reset`](Self::reset); the caller must then stop retrying.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.policy.max_attempts {
            return None;
        }
        self.attempts += 1;
        Some(self.policy.delay)
    }

    /// Clear the counter after a successful connection.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Retries scheduled since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.policy.max_attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.policy.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay, Duration::from_secs(5));
    }

    #[test]
    fn test_fourth_failure_schedules_nothing() {
        let mut state = ReconnectPolicy::new(3, Duration::from_secs(1)).tracker();

        for attempt in 1..=3 {
            assert_eq!(state.next_delay(), Some(Duration::from_secs(1)));
            assert_eq!(state.attempts(), attempt);
        }
        assert!(state.is_exhausted());
        assert_eq!(state.next_delay(), None);
        assert_eq!(state.next_delay(), None);
        assert_eq!(state.attempts(), 3);
    }

    #[test]
    fn test_reset_restores_budget() {
        let mut state = ReconnectPolicy::new(1, Duration::from_millis(10)).tracker();
        assert!(state.next_delay().is_some());
        assert!(state.next_delay().is_none());

        state.reset();
        assert_eq!(state.attempts(), 0);
        assert!(state.next_delay().is_some());
    }

    #[test]
    fn test_disabled_policy_never_retries() {
        let mut state = ReconnectPolicy::disabled().tracker();
        assert!(state.is_exhausted());
        assert_eq!(state.next_delay(), None);
    }
}
