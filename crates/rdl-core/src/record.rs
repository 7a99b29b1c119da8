//! Record file persistence for the piece ledger.
//!
//! The record is a single JSON object (`TotalSize`, `BlockSize`,
//! `DonePieces`). It is rewritten after every completed piece, through a
//! sibling temp file and a rename, so a crash leaves either the previous or
//! the new snapshot on disk and never a torn write.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::ledger::{LayoutError, Ledger};

/// Suffix of the record file derived from the output file name.
pub const RECORD_SUFFIX: &str = "_record.json";

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("failed to read record file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("record file {} is not a valid download record", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("record file {} is inconsistent", .path.display())]
    Layout {
        path: PathBuf,
        #[source]
        source: LayoutError,
    },
    #[error("failed to encode download record")]
    Encode(#[source] serde_json::Error),
    #[error("failed to write record file {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Default record path for an output file: `<file_name>_record.json`.
pub fn default_record_path(file_name: &Path) -> PathBuf {
    let mut o = file_name.as_os_str().to_owned();
    o.push(RECORD_SUFFIX);
    PathBuf::from(o)
}

/// Loads a ledger from `path`. A missing file yields an empty ledger whose
/// `block_size` is 0 (to be filled in from configuration).
pub fn load(path: &Path) -> Result<Ledger, RecordError> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no record file, starting fresh");
            return Ok(Ledger::default());
        }
        Err(source) => {
            return Err(RecordError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let mut ledger: Ledger = serde_json::from_slice(&data).map_err(|source| RecordError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    ledger.normalize().map_err(|source| RecordError::Layout {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(
        path = %path.display(),
        pieces = ledger.len(),
        done_bytes = ledger.done_byte_total(),
        "loaded record"
    );
    Ok(ledger)
}

/// Writes `ledger` to `path`, replacing any previous snapshot atomically.
pub fn save(ledger: &Ledger, path: &Path) -> Result<(), RecordError> {
    let json = serde_json::to_vec_pretty(ledger).map_err(RecordError::Encode)?;
    let tmp = temp_record_path(path);
    let write_err = |source| RecordError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut file = fs::File::create(&tmp).map_err(write_err)?;
    file.write_all(&json).map_err(write_err)?;
    file.sync_data().map_err(write_err)?;
    drop(file);
    fs::rename(&tmp, path).map_err(write_err)?;
    Ok(())
}

fn temp_record_path(path: &Path) -> PathBuf {
    let mut o = path.as_os_str().to_owned();
    o.push(".tmp");
    PathBuf::from(o)
}
