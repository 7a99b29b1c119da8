//! Attempt-level retry policy.
//!
//! A failed attempt (some piece not `Done` when every worker has exited) is
//! retried from the top with unfinished pieces reset, up to a fixed number of
//! attempts. Individual pieces are never retried inside a worker.

mod policy;
mod run;

pub use policy::{AttemptPolicy, RetryDecision, DEFAULT_MAX_ATTEMPTS};
pub use run::{run_attempts, AttemptsSummary};
