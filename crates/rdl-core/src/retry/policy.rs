use std::time::Duration;

use crate::coordinator::AttemptOutcome;

/// Attempts made before the whole download is reported as failed.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Decision returned by the policy after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Stop: the attempt succeeded or the cap is reached.
    NoRetry,
    /// Start another attempt after the given delay.
    RetryAfter(Duration),
}

/// Bounded attempt policy with a fixed pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Pause before the next attempt.
    pub delay: Duration,
}

impl Default for AttemptPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: Duration::ZERO,
        }
    }
}

impl AttemptPolicy {
    /// `attempt` is 1-based (1 = first attempt).
    pub fn decide(&self, attempt: u32, outcome: AttemptOutcome) -> RetryDecision {
        if outcome == AttemptOutcome::Succeeded || attempt >= self.max_attempts {
            return RetryDecision::NoRetry;
        }
        RetryDecision::RetryAfter(self.delay)
    }
}
