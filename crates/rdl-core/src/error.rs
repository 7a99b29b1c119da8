//! Error types at the download boundary.
//!
//! Setup errors abort before any worker starts and are never retried.
//! `DownloadFailed` is returned after the attempt cap is exhausted. Piece
//! errors live in `fetch::FetchError` and never reach this level.

use std::path::PathBuf;

use crate::fetch_head::ProbeError;
use crate::ledger::LayoutError;

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("invalid URL {url:?}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("HEAD request to {url} failed")]
    Probe {
        url: String,
        #[source]
        source: ProbeError,
    },
    #[error("{url} does not support range requests (no `Accept-Ranges: bytes`)")]
    RangesUnsupported { url: String },
    #[error("{url} did not report a Content-Length")]
    MissingContentLength { url: String },
    #[error("remote size {remote} does not match record size {record}")]
    SizeMismatch { record: u64, remote: u64 },
    #[error("record {} does not fit the remote file", .path.display())]
    InvalidRecord {
        path: PathBuf,
        #[source]
        source: LayoutError,
    },
}

/// Every attempt ended with unfinished pieces. Partial data and the record
/// stay on disk for a later run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("download incomplete after {attempts} attempt(s): {done_pieces} of {expected_pieces} pieces done")]
pub struct DownloadFailed {
    pub attempts: u32,
    pub done_pieces: usize,
    pub expected_pieces: usize,
}
