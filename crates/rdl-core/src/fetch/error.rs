//! Piece fetch error type.

/// Error returned by a single piece fetch. The worker turns any of these into
/// a failed-piece report; they never cross the worker boundary.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Curl reported an error (timeout, connection, proxy, etc.).
    #[error(transparent)]
    Curl(#[from] curl::Error),
    /// HTTP response had a non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),
    /// Transfer ended before the whole piece arrived (e.g. server closed early).
    #[error("partial transfer: expected {expected} bytes, got {received}")]
    PartialTransfer { expected: u64, received: u64 },
    /// Server sent more bytes than the piece holds (range ignored).
    #[error("response overran piece length {limit}")]
    Overrun { limit: u64 },
    /// Writing to the output file failed (disk full, permission denied).
    #[error("storage: {0}")]
    Storage(#[source] std::io::Error),
}

impl FetchError {
    pub(crate) fn storage(e: anyhow::Error) -> Self {
        let io_err = e
            .downcast::<std::io::Error>()
            .unwrap_or_else(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
        FetchError::Storage(io_err)
    }
}
