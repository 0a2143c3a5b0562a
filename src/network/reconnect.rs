//! Exponential backoff between connection attempts.

use std::time::Duration;

use crate::config::ReconnectConfig;

/// How often, and how patiently, a lost connection is re-established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay after the first failed attempt.
    pub initial_delay: Duration,
    /// Ceiling for the doubled delay.
    pub max_delay: Duration,
    /// Attempts per outage, the first one included.
    pub max_attempts: u32,
    /// Uptime after which a dropped connection counts as a fresh outage.
    /// A connection lost sooner keeps backing off where the last one left.
    pub stable_after: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            max_attempts: 5,
            stable_after: Duration::from_secs(30),
        }
    }
}

impl From<&ReconnectConfig> for ReconnectPolicy {
    fn from(config: &ReconnectConfig) -> Self {
        Self {
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_secs(config.max_delay_secs),
            max_attempts: config.max_attempts,
            stable_after: Duration::from_secs(config.stable_secs),
        }
    }
}

impl ReconnectPolicy {
    /// Start a fresh backoff sequence.
    pub fn backoff(&self) -> Backoff {
        Backoff {
            policy: *self,
            failures: 0,
            next: self.initial_delay,
        }
    }
}

/// Backoff state, carried across outages until a connection proves stable.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    failures: u32,
    next: Duration,
}

impl Backoff {
    /// Record a failed attempt and return how long to wait before the next
    /// one, or `None` once the attempt budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        self.failures += 1;
        if self.failures >= self.policy.max_attempts {
            return None;
        }

        let delay = self.next.min(self.policy.max_delay);
        self.next = self
            .next
            .checked_mul(2)
            .unwrap_or(self.policy.max_delay)
            .min(self.policy.max_delay);
        Some(delay)
    }

    /// Failed attempts recorded so far.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Forget past failures after a connection stayed up for `uptime`.
    ///
    /// Returns `true` if the sequence was reset. A shorter-lived connection
    /// leaves the count alone, so a server that accepts the login and then
    /// hangs up is dialled with growing delays.
    pub fn settle(&mut self, uptime: Duration) -> bool {
        if uptime < self.policy.stable_after {
            return false;
        }
        self.failures = 0;
        self.next = self.policy.initial_delay;
        true
    }
}
