//! Reconnection delay schedule.
//!
//! Delays start at the configured initial value and double per scheduled
//! attempt up to the configured ceiling. There is no jitter: the
//! schedule is deterministic and part of the channel's documented
//! behavior. The attempt counter resets only when a connection actually
//! opens, so repeated failures keep climbing toward the ceiling.

use std::time::Duration;

/// Capped exponential backoff state.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial_ms: u64,
    max_ms: u64,
    next_ms: u64,
    attempts: u32,
}

impl Backoff {
    /// Creates a schedule with the given bounds, in milliseconds.
    ///
    /// Zero or inverted bounds are clamped so the schedule always makes
    /// progress.
    pub fn new(initial_ms: u64, max_ms: u64) -> Self {
        let initial_ms = initial_ms.max(1);
        let max_ms = max_ms.max(initial_ms);
        Self {
            initial_ms,
            max_ms,
            next_ms: initial_ms,
            attempts: 0,
        }
    }

    /// Returns the delay for the attempt being scheduled and advances
    /// the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let delay = Duration::from_millis(self.next_ms);
        self.next_ms = self.next_ms.saturating_mul(2).min(self.max_ms);
        self.attempts += 1;
        delay
    }

    /// Number of reconnection attempts scheduled since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Restores the schedule to its initial delay. Called when a
    /// connection opens.
    pub fn reset(&mut self) {
        self.next_ms = self.initial_ms;
        self.attempts = 0;
    }
}
