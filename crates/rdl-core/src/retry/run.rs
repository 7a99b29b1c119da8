//! Retry loop: run attempts until one succeeds or the policy says stop.

use super::policy::{AttemptPolicy, RetryDecision};
use crate::coordinator::AttemptOutcome;

/// Result of the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptsSummary {
    pub outcome: AttemptOutcome,
    /// Attempts actually run (1-based count).
    pub attempts: u32,
}

/// Calls `attempt` with 1, 2, ... until it succeeds or the policy stops.
pub fn run_attempts<F>(policy: &AttemptPolicy, mut attempt: F) -> AttemptsSummary
where
    F: FnMut(u32) -> AttemptOutcome,
{
    let mut n = 1u32;
    loop {
        let outcome = attempt(n);
        match policy.decide(n, outcome) {
            RetryDecision::NoRetry => {
                return AttemptsSummary {
                    outcome,
                    attempts: n,
                }
            }
            RetryDecision::RetryAfter(d) => {
                tracing::info!(attempt = n, max = policy.max_attempts, "attempt failed, retrying");
                if !d.is_zero() {
                    std::thread::sleep(d);
                }
                n += 1;
            }
        }
    }
}
