//! Attempt coordination: the dispatch loop that owns the ledger.
//!
//! Each attempt resets unfinished pieces, starts the workers and the progress
//! reporter, then answers every worker report with exactly one work signal
//! over a rendezvous channel. Completed pieces are persisted one by one. The
//! attempt succeeds when every piece is `Done` after all workers exit; failed
//! attempts are retried per `AttemptPolicy`.

mod dispatch;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::DownloadFailed;
use crate::fetch::PieceFetcher;
use crate::ledger::{Ledger, PieceState};
use crate::progress::{ProgressCounters, ProgressReporter, ProgressSink, ReporterConfig};
use crate::record;
use crate::retry::{run_attempts, AttemptPolicy};
use crate::storage::StorageWriter;
use crate::worker::{Report, WorkResult, WorkSignal, Worker};

use self::dispatch::next_signal;

/// Final state of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded,
    Failed,
}

/// Runtime knobs for the dispatch loop.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Number of concurrent workers (at least 1).
    pub workers: usize,
    /// Pause after each dispatch. Zero disables the throttle.
    pub dispatch_delay: Duration,
    pub progress_interval: Duration,
    pub progress_sink: ProgressSink,
    pub attempts: AttemptPolicy,
    /// Times a failed piece goes back to `Pending` within one attempt. After
    /// that it waits for the next attempt, so a dead server cannot stall an
    /// attempt forever.
    pub piece_retries_per_attempt: u32,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            workers: 1,
            dispatch_delay: Duration::from_secs(1),
            progress_interval: Duration::from_secs(1),
            progress_sink: ProgressSink::Stderr,
            attempts: AttemptPolicy::default(),
            piece_retries_per_attempt: 2,
        }
    }
}

/// Summary of a successful download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadReport {
    pub attempts: u32,
    pub pieces: usize,
    pub total_bytes: u64,
}

/// Drives attempts for one download. Owns nothing shared with workers except
/// the fetcher and the output file.
pub struct Coordinator<F: ?Sized> {
    fetcher: Arc<F>,
    storage: StorageWriter,
    record_path: PathBuf,
    options: DownloadOptions,
}

impl<F: PieceFetcher + ?Sized + 'static> Coordinator<F> {
    pub fn new(
        fetcher: Arc<F>,
        storage: StorageWriter,
        record_path: impl Into<PathBuf>,
        options: DownloadOptions,
    ) -> Self {
        Coordinator {
            fetcher,
            storage,
            record_path: record_path.into(),
            options,
        }
    }

    /// Runs attempts until one succeeds or the attempt cap is reached. The
    /// output file and record are left in place either way.
    pub fn run(&self, ledger: &mut Ledger) -> Result<DownloadReport, DownloadFailed> {
        let summary = run_attempts(&self.options.attempts, |attempt| {
            self.run_attempt(ledger, attempt)
        });
        match summary.outcome {
            AttemptOutcome::Succeeded => {
                if let Err(e) = self.storage.sync() {
                    tracing::warn!(error = %format!("{:#}", e), "output sync failed");
                }
                tracing::info!(
                    attempts = summary.attempts,
                    file = %self.storage.path().display(),
                    "download succeeded"
                );
                Ok(DownloadReport {
                    attempts: summary.attempts,
                    pieces: ledger.len(),
                    total_bytes: ledger.total_size,
                })
            }
            AttemptOutcome::Failed => {
                tracing::error!(attempts = summary.attempts, "download failed");
                Err(DownloadFailed {
                    attempts: summary.attempts,
                    done_pieces: ledger.count_in(PieceState::Done),
                    expected_pieces: ledger.expected_piece_count(),
                })
            }
        }
    }

    /// One full attempt with a fresh worker set.
    pub fn run_attempt(&self, ledger: &mut Ledger, attempt: u32) -> AttemptOutcome {
        ledger.reset_incomplete();
        let workers = self.options.workers.max(1);
        let already_done = ledger.done_byte_total();
        tracing::info!(
            attempt,
            workers,
            done_bytes = already_done,
            total_bytes = ledger.total_size,
            "starting attempt"
        );

        let counters = ProgressCounters::new(workers);
        let reporter = ProgressReporter::spawn(
            counters.clone(),
            ReporterConfig {
                total_bytes: ledger.total_size,
                already_done,
                interval: self.options.progress_interval,
                sink: self.options.progress_sink,
            },
        );

        let (work_tx, work_rx) = mpsc::sync_channel::<WorkSignal>(0);
        let work_rx = Arc::new(Mutex::new(work_rx));
        let (result_tx, result_rx) = mpsc::channel::<Report>();
        let handles: Vec<_> = (0..workers)
            .map(|id| {
                Worker {
                    id,
                    fetcher: Arc::clone(&self.fetcher),
                    storage: self.storage.clone(),
                    counters: counters.clone(),
                    work_rx: Arc::clone(&work_rx),
                    results: result_tx.clone(),
                }
                .spawn()
            })
            .collect();
        drop(result_tx);
        drop(work_rx);

        let mut failures: HashMap<u64, u32> = HashMap::new();
        let mut exited = 0usize;

        while exited < workers {
            let report = match result_rx.recv() {
                Ok(report) => report,
                Err(_) => {
                    tracing::warn!(exited, workers, "all workers gone before exiting cleanly");
                    break;
                }
            };

            match report.result {
                WorkResult::WorkerExited => {
                    exited += 1;
                    continue;
                }
                WorkResult::ReadyForWork => {}
                WorkResult::PieceCompleted(reported) => {
                    if let Some(index) = resolve(ledger, &report, reported) {
                        ledger.mark(index, PieceState::Done);
                        self.persist(ledger);
                    }
                }
                WorkResult::PieceFailed(reported) => {
                    if let Some(index) = resolve(ledger, &report, reported) {
                        let start = ledger.pieces()[index].start;
                        let count = failures.entry(start).or_insert(0);
                        *count += 1;
                        if *count <= self.options.piece_retries_per_attempt {
                            ledger.mark(index, PieceState::Pending);
                        } else {
                            tracing::debug!(start, failures = *count, "piece parked until next attempt");
                        }
                    }
                }
            }

            if work_tx.send(next_signal(ledger)).is_err() {
                tracing::warn!("no worker left to receive work");
                break;
            }
            if !self.options.dispatch_delay.is_zero() {
                std::thread::sleep(self.options.dispatch_delay);
            }
        }
        drop(work_tx);

        for handle in handles {
            if handle.join().is_err() {
                tracing::warn!("worker thread panicked");
            }
        }

        let outcome = if ledger.is_complete() {
            AttemptOutcome::Succeeded
        } else {
            AttemptOutcome::Failed
        };
        reporter.finish(outcome);
        tracing::info!(
            attempt,
            ?outcome,
            done = ledger.count_in(PieceState::Done),
            expected = ledger.expected_piece_count(),
            "attempt finished"
        );
        outcome
    }

    fn persist(&self, ledger: &Ledger) {
        if let Err(e) = record::save(ledger, &self.record_path) {
            tracing::warn!(
                path = %self.record_path.display(),
                error = %e,
                "failed to save record"
            );
        }
    }
}

/// Current ledger index of a reported piece: the reported index if it still
/// holds the reported start, otherwise wherever that start now lives.
fn resolve(ledger: &Ledger, report: &Report, reported: usize) -> Option<usize> {
    let index = match report.start {
        Some(start) if ledger.get(reported).map(|p| p.start) != Some(start) => {
            ledger.position(start)
        }
        _ => ledger.get(reported).map(|_| reported),
    };
    if index.is_none() {
        tracing::warn!(worker = report.worker, index = reported, "report for an unknown piece");
    }
    index
}

#[cfg(test)]
mod tests;
