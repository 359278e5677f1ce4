//! Retry bookkeeping for chain reorganizations.

use std::time::Duration;

/// Counts recovery attempts after a block fails to connect.
///
/// Attempt `n` waits `n² × unit` before re-requesting. Once `max_attempts`
/// have been spent the next call to [`next_attempt`](Self::next_attempt)
/// returns `None` and the caller reports persistent divergence.
#[derive(Clone, Debug)]
pub struct ReorgRecovery {
    attempt: u32,
    max_attempts: u32,
    rollback_window: u32,
    unit: Duration,
}

impl ReorgRecovery {
    pub fn new(max_attempts: u32, rollback_window: u32, unit: Duration) -> Self {
        Self {
            attempt: 0,
            max_attempts,
            rollback_window,
            unit,
        }
    }

    /// Start the next attempt, returning how long to wait before it.
    pub fn next_attempt(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_attempts {
            return None;
        }
        self.attempt += 1;
        Some(self.unit.saturating_mul(self.attempt * self.attempt))
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Attempts spent since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_recovering(&self) -> bool {
        self.attempt > 0
    }

    /// Height to roll back to from `chain_height`, never below `floor`.
    pub fn rollback_target(&self, chain_height: u32, floor: u32) -> u32 {
        chain_height.saturating_sub(self.rollback_window).max(floor)
    }
}
