//! One complete download: setup checks, then the coordinator.
//!
//! Setup runs in a fixed order and every failure there is fatal (wrapped as
//! [`SetupError`] or a record/storage error with context). Only once the file
//! is sized and the ledger agrees with the server do workers start.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::coordinator::{Coordinator, DownloadOptions, DownloadReport};
use crate::error::SetupError;
use crate::fetch::{CurlFetcher, HttpOptions};
use crate::fetch_head::{self, HeadResult};
use crate::ledger::Ledger;
use crate::record;
use crate::storage::{StorageWriter, StorageWriterBuilder};
use crate::url_model::derive_file_name;

/// Default piece size for new downloads (4 MiB).
pub const DEFAULT_BLOCK_SIZE: u64 = 4 * 1024 * 1024;

/// Everything needed to run one download.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    /// Output file; derived from the URL when `None`.
    pub file_name: Option<PathBuf>,
    /// Record file; `<file_name>_record.json` when `None`.
    pub record_path: Option<PathBuf>,
    /// Piece size in bytes, used only when the record has none yet.
    pub block_size: u64,
    pub http: HttpOptions,
    pub options: DownloadOptions,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>) -> Self {
        DownloadRequest {
            url: url.into(),
            file_name: None,
            record_path: None,
            block_size: DEFAULT_BLOCK_SIZE,
            http: HttpOptions::default(),
            options: DownloadOptions::default(),
        }
    }
}

/// A validated download, ready to start workers.
pub struct Prepared {
    pub file_name: PathBuf,
    pub record_path: PathBuf,
    pub head: HeadResult,
    pub ledger: Ledger,
    storage: StorageWriter,
}

/// Probes the server, loads or starts the record and sizes the output file.
pub fn prepare(req: &DownloadRequest) -> Result<Prepared> {
    let url = url::Url::parse(&req.url).map_err(|source| SetupError::InvalidUrl {
        url: req.url.clone(),
        source,
    })?;
    if req.options.workers == 0 {
        return Err(SetupError::InvalidConfig("worker count must be at least 1".into()).into());
    }
    if req.block_size == 0 {
        return Err(SetupError::InvalidConfig("block size must be at least 1 byte".into()).into());
    }

    let head = fetch_head::probe(url.as_str(), &req.http).map_err(|source| SetupError::Probe {
        url: req.url.clone(),
        source,
    })?;
    tracing::debug!(
        url = %url,
        content_length = ?head.content_length,
        etag = ?head.etag,
        last_modified = ?head.last_modified,
        "HEAD probe"
    );
    if !head.accept_ranges {
        return Err(SetupError::RangesUnsupported {
            url: req.url.clone(),
        }
        .into());
    }
    let remote_size = head.content_length.ok_or_else(|| SetupError::MissingContentLength {
        url: req.url.clone(),
    })?;

    let file_name = req
        .file_name
        .clone()
        .unwrap_or_else(|| derive_file_name(&url));
    let record_path = req
        .record_path
        .clone()
        .unwrap_or_else(|| record::default_record_path(&file_name));

    let mut ledger = record::load(&record_path)?;
    if ledger.block_size == 0 {
        ledger.block_size = req.block_size;
    }
    if ledger.total_size != 0 && ledger.total_size != remote_size {
        return Err(SetupError::SizeMismatch {
            record: ledger.total_size,
            remote: remote_size,
        }
        .into());
    }
    ledger.total_size = remote_size;
    ledger
        .check_layout()
        .map_err(|source| SetupError::InvalidRecord {
            path: record_path.clone(),
            source,
        })?;
    tracing::info!(
        file = %file_name.display(),
        bytes = remote_size,
        block_size = ledger.block_size,
        done_bytes = ledger.done_byte_total(),
        "file size {}",
        remote_size
    );

    let storage = open_output(&file_name, remote_size)?;
    Ok(Prepared {
        file_name,
        record_path,
        head,
        ledger,
        storage,
    })
}

fn open_output(path: &Path, size: u64) -> Result<StorageWriter> {
    let mut builder = StorageWriterBuilder::open_or_create(path)?;
    builder
        .ensure_len(size)
        .with_context(|| format!("sizing output file {} to {} bytes", path.display(), size))?;
    Ok(builder.build())
}

/// Runs a whole download. Setup failures return early; exhausting every
/// attempt returns [`crate::error::DownloadFailed`] inside the `anyhow::Error`.
pub fn download(req: &DownloadRequest) -> Result<DownloadReport> {
    let Prepared {
        mut ledger,
        record_path,
        storage,
        ..
    } = prepare(req)?;

    let fetcher = Arc::new(CurlFetcher::new(req.url.clone(), req.http.clone()));
    let coordinator = Coordinator::new(fetcher, storage, record_path, req.options.clone());
    let report = coordinator.run(&mut ledger)?;
    Ok(report)
}
