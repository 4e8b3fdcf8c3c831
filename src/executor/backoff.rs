//! Exponential backoff between attempts.

use std::time::Duration;

/// Delay inserted after the attempt with the given 0-based index.
///
/// `delay_for(base, i) == base * 2^i`, saturating instead of overflowing.
pub fn delay_for(base: Duration, attempt_index: u32) -> Duration {
    let factor = 2u32.checked_pow(attempt_index).unwrap_or(u32::MAX);
    base.saturating_mul(factor)
}

/// Per-job attempt state.
///
/// Owned by a single `execute` call and dropped when it returns.
#[derive(Debug, Clone)]
pub struct Backoff {
    attempt: u32,
    base: Duration,
}

impl Backoff {
    pub fn new(base: Duration) -> Self {
        Self { attempt: 0, base }
    }

    /// 0-based index of the attempt about to run.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay to wait before the next attempt.
    pub fn current_delay(&self) -> Duration {
        delay_for(self.base, self.attempt)
    }

    /// Move to the next attempt, returning the delay to sleep first.
    pub fn advance(&mut self) -> Duration {
        let delay = self.current_delay();
        self.attempt = self.attempt.saturating_add(1);
        delay
    }
}
