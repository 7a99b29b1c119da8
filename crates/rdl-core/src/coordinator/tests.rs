//! Coordinator tests with in-process fetchers (no network).

use super::*;
use crate::fetch::FetchError;
use crate::ledger::Piece;
use crate::storage::StorageWriterBuilder;
use crate::worker::PieceTask;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Serves ranges of `body`; the first `fail_first` calls fail.
struct ScriptedFetcher {
    body: Vec<u8>,
    fail_first: usize,
    calls: AtomicUsize,
    fetched: Mutex<Vec<u64>>,
}

impl ScriptedFetcher {
    fn new(body: Vec<u8>, fail_first: usize) -> Self {
        ScriptedFetcher {
            body,
            fail_first,
            calls: AtomicUsize::new(0),
            fetched: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fetched_starts(&self) -> Vec<u64> {
        let mut v = self.fetched.lock().unwrap().clone();
        v.sort_unstable();
        v
    }
}

impl PieceFetcher for ScriptedFetcher {
    fn fetch(
        &self,
        _worker: usize,
        task: &PieceTask,
        sink: &mut dyn FnMut(&[u8]) -> Result<(), FetchError>,
    ) -> Result<(), FetchError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_first {
            return Err(FetchError::Http(503));
        }
        let start = task.start as usize;
        let end = task.end_inclusive() as usize;
        for chunk in self.body[start..=end].chunks(1000) {
            sink(chunk)?;
        }
        self.fetched.lock().unwrap().push(task.start);
        Ok(())
    }
}

fn body(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn options(workers: usize, max_attempts: u32) -> DownloadOptions {
    DownloadOptions {
        workers,
        dispatch_delay: Duration::ZERO,
        progress_interval: Duration::from_millis(10),
        progress_sink: ProgressSink::Hidden,
        attempts: AttemptPolicy {
            max_attempts,
            delay: Duration::ZERO,
        },
        piece_retries_per_attempt: 0,
    }
}

struct Fixture {
    dir: tempfile::TempDir,
    storage: StorageWriter,
}

impl Fixture {
    fn new(len: u64) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut builder = StorageWriterBuilder::open_or_create(&dir.path().join("out.bin")).unwrap();
        builder.ensure_len(len).unwrap();
        Fixture {
            storage: builder.build(),
            dir,
        }
    }

    fn record(&self) -> PathBuf {
        self.dir.path().join("out.bin_record.json")
    }

    fn contents(&self) -> Vec<u8> {
        std::fs::read(self.dir.path().join("out.bin")).unwrap()
    }
}

const BLOCK: u64 = 4096;

#[test]
fn two_workers_fetch_four_pieces() {
    let data = body(4 * BLOCK as usize);
    let fx = Fixture::new(data.len() as u64);
    let fetcher = Arc::new(ScriptedFetcher::new(data.clone(), 0));
    let coordinator = Coordinator::new(Arc::clone(&fetcher), fx.storage.clone(), fx.record(), options(2, 10));

    let mut ledger = Ledger::new(data.len() as u64, BLOCK);
    let report = coordinator.run(&mut ledger).unwrap();

    assert_eq!(report.attempts, 1);
    assert_eq!(report.pieces, 4);
    assert_eq!(ledger.len(), 4);
    assert!(ledger.is_complete());
    assert_eq!(fetcher.fetched_starts(), vec![0, BLOCK, 2 * BLOCK, 3 * BLOCK]);
    assert_eq!(fx.contents(), data);
    assert_eq!(record::load(&fx.record()).unwrap(), ledger);
}

#[test]
fn short_final_piece_and_more_workers_than_pieces() {
    let data = body(2 * BLOCK as usize + 17);
    let fx = Fixture::new(data.len() as u64);
    let fetcher = Arc::new(ScriptedFetcher::new(data.clone(), 0));
    let coordinator = Coordinator::new(Arc::clone(&fetcher), fx.storage.clone(), fx.record(), options(6, 10));

    let mut ledger = Ledger::new(data.len() as u64, BLOCK);
    coordinator.run(&mut ledger).unwrap();

    assert_eq!(ledger.len(), 3);
    assert_eq!(ledger.done_byte_total(), data.len() as u64);
    assert_eq!(fetcher.calls(), 3);
    assert_eq!(fx.contents(), data);
}

#[test]
fn resume_fetches_only_missing_pieces() {
    let data = body(4 * BLOCK as usize);
    let fx = Fixture::new(data.len() as u64);

    // Pieces 0 and 2 were finished and persisted by an earlier run.
    let mut ledger = Ledger::new(data.len() as u64, BLOCK);
    for start in [0, 2 * BLOCK] {
        let i = ledger.insert(Piece::pending(start));
        ledger.mark(i, PieceState::Done);
        let range = start as usize..(start + BLOCK) as usize;
        fx.storage.write_at(start, &data[range]).unwrap();
    }
    record::save(&ledger, &fx.record()).unwrap();
    let mut ledger = record::load(&fx.record()).unwrap();

    let fetcher = Arc::new(ScriptedFetcher::new(data.clone(), 0));
    let coordinator = Coordinator::new(Arc::clone(&fetcher), fx.storage.clone(), fx.record(), options(2, 10));
    coordinator.run(&mut ledger).unwrap();

    assert_eq!(fetcher.fetched_starts(), vec![BLOCK, 3 * BLOCK]);
    assert!(ledger.is_complete());
    assert_eq!(fx.contents(), data);
}

#[test]
fn interrupted_in_progress_pieces_are_refetched() {
    let data = body(4 * BLOCK as usize);
    let fx = Fixture::new(data.len() as u64);
    fx.storage.write_at(0, &data[..BLOCK as usize]).unwrap();

    // A crash left piece 1 InProgress in the record.
    let mut ledger = Ledger::new(data.len() as u64, BLOCK);
    let i = ledger.insert(Piece::pending(0));
    ledger.mark(i, PieceState::Done);
    let i = ledger.insert(Piece::pending(BLOCK));
    ledger.mark(i, PieceState::InProgress);

    let fetcher = Arc::new(ScriptedFetcher::new(data.clone(), 0));
    let coordinator = Coordinator::new(Arc::clone(&fetcher), fx.storage.clone(), fx.record(), options(1, 10));
    coordinator.run(&mut ledger).unwrap();

    assert_eq!(fetcher.fetched_starts(), vec![BLOCK, 2 * BLOCK, 3 * BLOCK]);
    assert_eq!(fx.contents(), data);
}

#[test]
fn every_fetch_failing_exhausts_attempts() {
    let data = body(4 * BLOCK as usize);
    let fx = Fixture::new(data.len() as u64);
    let fetcher = Arc::new(ScriptedFetcher::new(data, usize::MAX));
    let coordinator = Coordinator::new(Arc::clone(&fetcher), fx.storage.clone(), fx.record(), options(2, 3));

    let mut ledger = Ledger::new(4 * BLOCK, BLOCK);
    let err = coordinator.run(&mut ledger).unwrap_err();

    assert_eq!(err.attempts, 3);
    assert_eq!(err.done_pieces, 0);
    assert_eq!(err.expected_pieces, 4);
    // Each attempt tries every piece once before parking it.
    assert_eq!(fetcher.calls(), 3 * 4);
    ledger.reset_incomplete();
    assert_eq!(ledger.count_in(PieceState::Done), 0);
    assert_eq!(ledger.count_in(PieceState::Pending), 4);
    // Nothing completed, so nothing was persisted.
    assert!(!fx.record().exists());
}

#[test]
fn single_failed_attempt_then_success() {
    let data = body(4 * BLOCK as usize);
    let fx = Fixture::new(data.len() as u64);
    // One worker: the first four calls are exactly the first attempt.
    let fetcher = Arc::new(ScriptedFetcher::new(data.clone(), 4));
    let coordinator = Coordinator::new(Arc::clone(&fetcher), fx.storage.clone(), fx.record(), options(1, 10));

    let mut ledger = Ledger::new(data.len() as u64, BLOCK);
    let report = coordinator.run(&mut ledger).unwrap();

    assert_eq!(report.attempts, 2);
    assert_eq!(fetcher.calls(), 8);
    assert_eq!(fx.contents(), data);
}

#[test]
fn failed_piece_is_rescheduled_within_attempt() {
    let data = body(2 * BLOCK as usize);
    let fx = Fixture::new(data.len() as u64);
    let fetcher = Arc::new(ScriptedFetcher::new(data.clone(), 1));
    let mut opts = options(1, 1);
    opts.piece_retries_per_attempt = 1;
    let coordinator = Coordinator::new(Arc::clone(&fetcher), fx.storage.clone(), fx.record(), opts);

    let mut ledger = Ledger::new(data.len() as u64, BLOCK);
    let report = coordinator.run(&mut ledger).unwrap();

    assert_eq!(report.attempts, 1);
    assert_eq!(fetcher.calls(), 3);
    assert_eq!(fx.contents(), data);
}

#[test]
fn zero_length_resource_succeeds_without_fetching() {
    let fx = Fixture::new(0);
    let fetcher = Arc::new(ScriptedFetcher::new(Vec::new(), 0));
    let coordinator = Coordinator::new(Arc::clone(&fetcher), fx.storage.clone(), fx.record(), options(2, 10));
    let mut ledger = Ledger::new(0, BLOCK);
    let report = coordinator.run(&mut ledger).unwrap();
    assert_eq!(report.attempts, 1);
    assert_eq!(fetcher.calls(), 0);
}

#[test]
fn resolve_relocates_shifted_piece() {
    let mut ledger = Ledger::new(30, 10);
    ledger.insert(Piece::pending(20));
    ledger.insert(Piece::pending(0));
    let report = Report {
        worker: 0,
        result: WorkResult::PieceCompleted(0),
        start: Some(20),
    };
    // Index 0 now holds start 0; start 20 moved to index 1.
    assert_eq!(resolve(&ledger, &report, 0), Some(1));
    let stale = Report {
        start: Some(10),
        ..report
    };
    assert_eq!(resolve(&ledger, &stale, 0), None);
}

#[test]
fn out_of_order_record_resumes_and_finishes() {
    let data = body(2 * BLOCK as usize);
    let fx = Fixture::new(data.len() as u64);
    fx.storage.write_at(BLOCK, &data[BLOCK as usize..]).unwrap();
    let raw = format!(
        r#"{{"TotalSize":{},"BlockSize":{},"DonePieces":[{{"Start":{},"State":2}},{{"Start":0,"State":0}}]}}"#,
        data.len(),
        BLOCK,
        BLOCK
    );
    std::fs::write(fx.record(), raw).unwrap();
    let mut ledger = record::load(&fx.record()).unwrap();

    let fetcher = Arc::new(ScriptedFetcher::new(data.clone(), 0));
    let coordinator = Coordinator::new(Arc::clone(&fetcher), fx.storage.clone(), fx.record(), options(1, 1));
    let report = coordinator.run(&mut ledger).unwrap();

    assert_eq!(report.attempts, 1);
    assert_eq!(fetcher.fetched_starts(), vec![0]);
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(fx.contents(), data);
}
