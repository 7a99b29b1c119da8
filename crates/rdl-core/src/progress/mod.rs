//! Live progress reporting for one download attempt.
//!
//! The reporter runs on its own thread, samples the per-worker counters every
//! interval and redraws a single status line. The coordinator stops it with
//! the attempt outcome; the reporter prints a final notice and the join is
//! the acknowledgement.

mod render;
mod stats;

pub use render::{format_bytes, format_eta, status_text, StatusLine};
pub use stats::{ProgressCounters, ProgressStats};

use std::io::Write;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::coordinator::AttemptOutcome;

/// Where the status line goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressSink {
    #[default]
    Stderr,
    /// Sample and log, but draw nothing.
    Hidden,
}

/// Inputs for one reporter run.
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    pub total_bytes: u64,
    /// `Ledger::done_byte_total` at attempt start.
    pub already_done: u64,
    pub interval: Duration,
    pub sink: ProgressSink,
}

/// Handle to a running reporter thread.
pub struct ProgressReporter {
    stop_tx: mpsc::Sender<AttemptOutcome>,
    handle: JoinHandle<Option<ProgressStats>>,
}

impl ProgressReporter {
    pub fn spawn(counters: ProgressCounters, cfg: ReporterConfig) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel();
        let handle = std::thread::spawn(move || run(counters, cfg, stop_rx));
        ProgressReporter { stop_tx, handle }
    }

    /// Signals the end of the attempt and waits for the reporter to finish.
    /// Returns the last sample taken, if any.
    pub fn finish(self, outcome: AttemptOutcome) -> Option<ProgressStats> {
        let _ = self.stop_tx.send(outcome);
        match self.handle.join() {
            Ok(last) => last,
            Err(_) => {
                tracing::warn!("progress reporter panicked");
                None
            }
        }
    }
}

fn run(
    counters: ProgressCounters,
    cfg: ReporterConfig,
    stop_rx: mpsc::Receiver<AttemptOutcome>,
) -> Option<ProgressStats> {
    let started = Instant::now();
    let mut last_sample_at = started;
    let mut last_total = 0u64;
    let mut last_stats = None;
    let mut line = StatusLine::default();

    let outcome = loop {
        match stop_rx.recv_timeout(cfg.interval) {
            Ok(outcome) => break outcome,
            Err(RecvTimeoutError::Disconnected) => break AttemptOutcome::Failed,
            Err(RecvTimeoutError::Timeout) => {}
        }

        let now = Instant::now();
        let transferred = counters.total();
        let stats = ProgressStats {
            transferred,
            already_done: cfg.already_done,
            total_bytes: cfg.total_bytes,
            elapsed: now.duration_since(started),
            speed: stats::speed_over(
                transferred.saturating_sub(last_total),
                now.duration_since(last_sample_at),
            ),
        };
        last_total = transferred;
        last_sample_at = now;

        if cfg.sink == ProgressSink::Stderr {
            let frame = line.frame(&status_text(&stats));
            let mut err = std::io::stderr().lock();
            let _ = err.write_all(frame.as_bytes());
            let _ = err.flush();
        }
        last_stats = Some(stats);
    };

    let notice = match outcome {
        AttemptOutcome::Succeeded => "download complete",
        AttemptOutcome::Failed => "download not complete, restarting unfinished pieces",
    };
    if cfg.sink == ProgressSink::Stderr {
        let mut err = std::io::stderr().lock();
        if line.is_drawn() {
            let _ = writeln!(err);
        }
        let _ = writeln!(err, "{}", notice);
    }
    match outcome {
        AttemptOutcome::Succeeded => tracing::info!("{}", notice),
        AttemptOutcome::Failed => tracing::warn!("{}", notice),
    }
    last_stats
}
