//! Progress sampling (bytes transferred, speed, ETA).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Per-worker byte counters for one attempt. Each counter is written only by
/// its worker and read by the reporter.
#[derive(Debug, Clone)]
pub struct ProgressCounters(Arc<[AtomicU64]>);

impl ProgressCounters {
    pub fn new(workers: usize) -> Self {
        ProgressCounters((0..workers).map(|_| AtomicU64::new(0)).collect())
    }

    pub fn add(&self, worker: usize, bytes: u64) {
        if let Some(counter) = self.0.get(worker) {
            counter.fetch_add(bytes, Ordering::Relaxed);
        }
    }

    pub fn get(&self, worker: usize) -> u64 {
        self.0
            .get(worker)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Sum over all workers.
    pub fn total(&self) -> u64 {
        self.0.iter().map(|c| c.load(Ordering::Relaxed)).sum()
    }
}

/// One sample of attempt progress.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressStats {
    /// Bytes received by all workers during this attempt.
    pub transferred: u64,
    /// Bytes already `Done` when the attempt started.
    pub already_done: u64,
    /// Total resource size in bytes.
    pub total_bytes: u64,
    /// Time since the attempt started.
    pub elapsed: Duration,
    /// Bytes per second over the last sampling interval.
    pub speed: u64,
}

impl ProgressStats {
    /// Completion percentage in [0, 100].
    pub fn percent(&self) -> u64 {
        if self.total_bytes == 0 {
            return 100;
        }
        ((self.transferred + self.already_done).saturating_mul(100) / self.total_bytes).min(100)
    }

    /// Average bytes per second since the attempt started (0 if no time elapsed).
    pub fn average_speed(&self) -> u64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0;
        }
        (self.transferred as f64 / secs) as u64
    }

    pub fn remaining(&self) -> u64 {
        self.total_bytes
            .saturating_sub(self.already_done + self.transferred)
    }

    /// Estimated time left at the current speed; `None` while speed is 0.
    pub fn eta(&self) -> Option<Duration> {
        if self.speed == 0 {
            return None;
        }
        Some(Duration::from_secs(self.remaining() / self.speed))
    }
}

/// Speed in bytes per second from a counter delta over `interval`.
pub(crate) fn speed_over(delta: u64, interval: Duration) -> u64 {
    let secs = interval.as_secs_f64();
    if secs <= 0.0 {
        return 0;
    }
    (delta as f64 / secs) as u64
}
