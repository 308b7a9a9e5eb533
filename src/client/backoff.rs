//! Reconnect backoff policy.
//!
//! Exponential backoff with a floor and ceiling, governing when the client
//! retries after an unintentional disconnect. The delay doubles on each
//! consecutive failure and resets to the initial value on a successful
//! open. There is no attempt cutoff; retries continue until an intentional
//! disconnect.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Default first-retry delay (3s per design).
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(3);

/// Default delay ceiling (60s per design).
pub const DEFAULT_DELAY_CEILING: Duration = Duration::from_secs(60);

// ============================================================================
// ReconnectBackoff
// ============================================================================

/// Scalar backoff state: current delay, floor, and ceiling.
///
/// [`next_delay`](Self::next_delay) yields the delay to use for the retry
/// being scheduled *now* and doubles the stored delay for the retry after
/// it, clamped to the ceiling. A successful open calls
/// [`reset`](Self::reset).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectBackoff {
    /// Delay used for the first retry after a successful open.
    initial: Duration,
    /// Upper bound on any single delay.
    ceiling: Duration,
    /// Delay for the next scheduled retry.
    current: Duration,
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_DELAY, DEFAULT_DELAY_CEILING)
    }
}

impl ReconnectBackoff {
    /// Creates a backoff with the given floor and ceiling.
    ///
    /// A ceiling below the initial delay clamps every retry to the ceiling.
    #[must_use]
    pub fn new(initial: Duration, ceiling: Duration) -> Self {
        Self {
            initial,
            ceiling,
            current: initial.min(ceiling),
        }
    }

    /// Returns the delay for the retry being scheduled and advances the
    /// doubling sequence.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = delay.saturating_mul(2).min(self.ceiling);
        delay
    }

    /// Resets the sequence to the initial delay.
    ///
    /// Called on every successful open, regardless of how many doublings
    /// preceded it.
    #[inline]
    pub fn reset(&mut self) {
        self.current = self.initial.min(self.ceiling);
    }

    /// Returns the delay the next [`next_delay`](Self::next_delay) call
    /// will yield.
    #[inline]
    #[must_use]
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Returns the configured initial delay.
    #[inline]
    #[must_use]
    pub fn initial(&self) -> Duration {
        self.initial
    }

    /// Returns the configured ceiling.
    #[inline]
    #[must_use]
    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }
}

// ============================================================================
// Tests
// ============================================================================
