//! Backoff policy for the drain loop's sidecar reconnects.
//!
//! The drain loop never gives up: the sidecar lives on localhost and
//! comes back when it comes back. What matters is not hammering it while
//! it is down, and recovering the moment it returns. Delays grow
//! exponentially to a cap, and the first success resets the sequence.

use std::time::Duration;

/// Exponential backoff with a cap. A value object: construct one, keep it
/// around, ask it how long to wait after the n-th consecutive failure.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Delay after the first failure.
    pub initial_delay: Duration,
    /// Ceiling for the computed delay.
    pub max_delay: Duration,
    /// Growth factor per additional failure.
    pub multiplier: f64,
}

impl RetryPolicy {
    /// Reconnect pacing for the sidecar drain: 1 s doubling to a 30 s cap
    /// (1, 2, 4, 8, 16, 30, 30, ...).
    pub const RECONNECT: RetryPolicy = RetryPolicy {
        initial_delay: Duration::from_secs(1),
        max_delay: Duration::from_secs(30),
        multiplier: 2.0,
    };

    /// Delay to wait after failure number `attempt + 1`; `attempt` is
    /// zero-based, so the first failure waits `initial_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let multiplier = self.multiplier.powi(attempt as i32);
        let delay_secs = self.initial_delay.as_secs_f64() * multiplier;
        // Cap while still an f64: the product overflows to infinity long
        // before Duration could represent it.
        let capped = delay_secs.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// The delay sequence, one entry per consecutive failure. Infinite;
    /// take what you need.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0u32..).map(move |attempt| self.delay_for_attempt(attempt))
    }
}

/// A policy plus the consecutive-failure count it is applied to.
///
/// The drain loop owns one and reports each fetch outcome; the counter
/// climbs on failures and drops back to zero on the first success, so
/// the delay after a recovered outage starts over at `initial_delay`.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    policy: RetryPolicy,
    failures: u32,
}

impl Backoff {
    pub fn new(policy: RetryPolicy) -> Self {
        Backoff {
            policy,
            failures: 0,
        }
    }

    /// Records one more failure and returns how long to wait before the
    /// next attempt.
    pub fn on_failure(&mut self) -> Duration {
        let delay = self.policy.delay_for_attempt(self.failures);
        self.failures = self.failures.saturating_add(1);
        delay
    }

    /// Records a success, resetting the sequence to its initial delay.
    pub fn on_success(&mut self) {
        self.failures = 0;
    }
}
