//! Download workers.
//!
//! A worker announces itself with `ReadyForWork`, then repeatedly claims one
//! `WorkSignal` from the shared rendezvous channel, fetches that single piece
//! into the output file and reports the outcome by value. Workers never see
//! the ledger; they only get an immutable `PieceTask`.

use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::fetch::{FetchError, PieceFetcher};
use crate::progress::ProgressCounters;
use crate::storage::StorageWriter;

/// Immutable description of one piece handed to a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceTask {
    /// Ledger index of the piece, echoed back in the report.
    pub index: usize,
    pub start: u64,
    /// Piece length: `min(block_size, total_size - start)`, never 0.
    pub len: u64,
}

impl PieceTask {
    pub fn end_inclusive(&self) -> u64 {
        self.start + self.len - 1
    }

    /// `Range` header value: `bytes=start-end`.
    pub fn range_header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end_inclusive())
    }
}

/// Coordinator -> worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkSignal {
    Fetch(PieceTask),
    Exit,
}

/// Worker -> coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkResult {
    ReadyForWork,
    PieceCompleted(usize),
    PieceFailed(usize),
    WorkerExited,
}

/// A `WorkResult` tagged with the worker that sent it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    pub worker: usize,
    pub result: WorkResult,
    /// Start of the reported piece, so the coordinator can re-locate it if an
    /// insert shifted ledger indices since dispatch.
    pub start: Option<u64>,
}

pub(crate) struct Worker<F: ?Sized> {
    pub(crate) id: usize,
    pub(crate) fetcher: Arc<F>,
    pub(crate) storage: StorageWriter,
    pub(crate) counters: ProgressCounters,
    pub(crate) work_rx: Arc<Mutex<Receiver<WorkSignal>>>,
    pub(crate) results: Sender<Report>,
}

impl<F: PieceFetcher + ?Sized + 'static> Worker<F> {
    pub(crate) fn spawn(self) -> JoinHandle<()> {
        std::thread::spawn(move || self.run())
    }

    fn run(self) {
        if self.report(WorkResult::ReadyForWork, None).is_err() {
            return;
        }
        loop {
            let signal = {
                // Held only while waiting; a poisoned lock still guards a usable receiver.
                let rx = self.work_rx.lock().unwrap_or_else(|e| e.into_inner());
                rx.recv()
            };
            let task = match signal {
                Ok(WorkSignal::Fetch(task)) => task,
                Ok(WorkSignal::Exit) | Err(_) => break,
            };

            let result = match self.fetch_piece(&task) {
                Ok(()) => {
                    tracing::debug!(worker = self.id, index = task.index, start = task.start, "piece done");
                    WorkResult::PieceCompleted(task.index)
                }
                Err(e) => {
                    tracing::warn!(
                        worker = self.id,
                        index = task.index,
                        start = task.start,
                        error = %e,
                        "piece failed"
                    );
                    WorkResult::PieceFailed(task.index)
                }
            };
            if self.report(result, Some(task.start)).is_err() {
                return;
            }
        }
        let _ = self.report(WorkResult::WorkerExited, None);
        tracing::debug!(worker = self.id, "worker exited");
    }

    fn report(&self, result: WorkResult, start: Option<u64>) -> Result<(), ()> {
        self.results
            .send(Report {
                worker: self.id,
                result,
                start,
            })
            .map_err(|_| ())
    }

    /// Streams one piece into the file at its offset and into this worker's counter.
    fn fetch_piece(&self, task: &PieceTask) -> Result<(), FetchError> {
        let end = task.start + task.len;
        let mut offset = task.start;
        let mut sink = |data: &[u8]| -> Result<(), FetchError> {
            let n = data.len() as u64;
            if offset + n > end {
                return Err(FetchError::Overrun { limit: task.len });
            }
            self.storage
                .write_at(offset, data)
                .map_err(FetchError::storage)?;
            offset += n;
            self.counters.add(self.id, n);
            Ok(())
        };
        self.fetcher.fetch(self.id, task, &mut sink)?;

        let received = offset - task.start;
        if received != task.len {
            return Err(FetchError::PartialTransfer {
                expected: task.len,
                received,
            });
        }
        Ok(())
    }
}
