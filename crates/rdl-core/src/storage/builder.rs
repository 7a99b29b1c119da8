//! Builder for opening and sizing the output file.

use anyhow::{Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};

use super::writer::StorageWriter;
#[cfg(unix)]
use std::os::unix::io::AsRawFd;

/// Opens the output file for a download. Call `ensure_len` then `build` to get
/// a `StorageWriter` shared by all workers.
pub struct StorageWriterBuilder {
    file: File,
    path: PathBuf,
}

impl StorageWriterBuilder {
    /// Open `path` for writing, creating it if missing. Existing content is
    /// kept so pieces already written by an earlier run survive.
    pub fn open_or_create(path: &Path) -> Result<Self> {
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("failed to open output file: {}", path.display()))?;
        Ok(StorageWriterBuilder {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Make the file exactly `size` bytes long. Growing tries `posix_fallocate`
    /// first on Unix and falls back to `set_len`.
    pub fn ensure_len(&mut self, size: u64) -> Result<()> {
        let current = self
            .file
            .metadata()
            .with_context(|| format!("failed to stat {}", self.path.display()))?
            .len();
        if current == size {
            return Ok(());
        }
        if current < size {
            #[cfg(unix)]
            {
                let fd = self.file.as_raw_fd();
                let r = unsafe { libc::posix_fallocate(fd, 0, size as libc::off_t) };
                if r == 0 {
                    return Ok(());
                }
                tracing::debug!(errno = r, "posix_fallocate failed, falling back to set_len");
            }
        }
        self.file
            .set_len(size)
            .context("failed to size output file")?;
        Ok(())
    }

    pub fn build(self) -> StorageWriter {
        StorageWriter::from_file_and_path(self.file, self.path)
    }
}
