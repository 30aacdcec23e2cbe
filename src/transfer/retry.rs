//! Resubmission policy for contention failures

use rand::Rng;
use std::time::Duration;

use crate::config::{ConcurrencyMode, TransferConfig};

/// Optimistic writes lose races by design; a single attempt would surface
/// every lost race to the caller.
pub const MIN_OPTIMISTIC_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base: Duration,
    max: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base: Duration, max: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base,
            max: max.max(base),
        }
    }

    /// One attempt, no backoff
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    pub fn from_config(config: &TransferConfig) -> Self {
        let attempts = match config.mode {
            ConcurrencyMode::Pessimistic => config.max_attempts,
            ConcurrencyMode::Optimistic => config.max_attempts.max(MIN_OPTIMISTIC_ATTEMPTS),
        };
        Self::new(
            attempts,
            Duration::from_millis(config.backoff_base_ms),
            Duration::from_millis(config.backoff_max_ms),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before attempt `attempt + 1`, where `attempt` is the 1-based
    /// number of the attempt that just failed.
    ///
    /// `base * 2^(attempt-1)`, capped at `max`, then jittered down to a
    /// uniform value in `[cap/2, cap]` so colliding callers spread out.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let cap = self
            .base
            .checked_mul(1u32 << exp)
            .unwrap_or(self.max)
            .min(self.max);

        let cap_ms = cap.as_millis() as u64;
        if cap_ms == 0 {
            return cap;
        }
        let jittered = rand::thread_rng().gen_range(cap_ms / 2..=cap_ms);
        Duration::from_millis(jittered)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}
