//! # Restart Backoff
//!
//! Delay policies applied between failed attempts to open a change feed.
//!
//! [`FixedBackoff`] waits the same interval every time (5s by default, no
//! jitter). [`FibonacciBackoff`] grows more slowly than exponential backoff:
//! with a 1s minimum and 10s maximum the sequence is 1s, 1s, 2s, 3s, 5s, 8s,
//! 10s, 10s, ... Both are reset once a feed opens successfully.

use std::fmt::Debug;
use std::time::Duration;

/// Default delay after a failed watch open
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Delay policy for restarting a failed watch.
pub trait Backoff: Send + Sync + Debug {
    /// Returns the delay to wait now and advances the policy.
    fn next_delay(&mut self) -> Duration;

    /// Returns the policy to its initial state after a success.
    fn reset(&mut self);
}

/// Constant delay between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedBackoff {
    delay: Duration,
}

impl FixedBackoff {
    /// Waits `delay` before every retry.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FixedBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_DELAY)
    }
}

impl Backoff for FixedBackoff {
    fn next_delay(&mut self) -> Duration {
        self.delay
    }

    fn reset(&mut self) {}
}

/// Fibonacci backoff calculator
///
/// Each delay is the sum of the previous two, starting from `min` twice and
/// capped at `max`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Minimum delay (for reset)
    min: Duration,
    /// Previous delay
    prev: Duration,
    /// Current delay
    current: Duration,
    /// Maximum delay
    max: Duration,
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff with the given minimum and maximum delays
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            prev: Duration::ZERO,
            current: min,
            max,
        }
    }
}

impl Backoff for FibonacciBackoff {
    fn next_delay(&mut self) -> Duration {
        let result = self.current;

        let next = self.prev.saturating_add(self.current);
        self.prev = self.current;
        self.current = std::cmp::min(next, self.max);

        result
    }

    fn reset(&mut self) {
        self.prev = Duration::ZERO;
        self.current = self.min;
    }
}
