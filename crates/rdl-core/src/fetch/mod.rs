//! Range fetching for single pieces.
//!
//! `PieceFetcher` is the seam between workers and the network: a worker hands
//! it one piece and a sink, and the fetcher streams the piece's bytes into the
//! sink. `CurlFetcher` is the libcurl implementation used in production.

mod curl_fetcher;
mod error;
mod proxy;

pub use curl_fetcher::CurlFetcher;
pub use error::FetchError;
pub use proxy::ProxyList;

use std::time::Duration;

use crate::worker::PieceTask;

/// Fetches the bytes of one piece.
///
/// `sink` receives body chunks in order; returning an error from it aborts the
/// transfer and that error is returned from `fetch`. Implementations must not
/// retry internally.
pub trait PieceFetcher: Send + Sync {
    fn fetch(
        &self,
        worker: usize,
        task: &PieceTask,
        sink: &mut dyn FnMut(&[u8]) -> Result<(), FetchError>,
    ) -> Result<(), FetchError>;
}

/// Abort a transfer whose throughput stays below `bytes_per_sec` for `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LowSpeedLimit {
    pub bytes_per_sec: u32,
    pub window: Duration,
}

/// Connection settings shared by the HEAD probe and range GETs.
#[derive(Debug, Clone, Default)]
pub struct HttpOptions {
    pub proxies: ProxyList,
    pub connect_timeout: Option<Duration>,
    /// Wall-clock limit for one whole piece fetch. `None` waits indefinitely.
    pub fetch_timeout: Option<Duration>,
    pub low_speed: Option<LowSpeedLimit>,
}

impl HttpOptions {
    /// Applies proxy and timeout settings to a curl handle.
    pub(crate) fn apply(&self, easy: &mut curl::easy::Easy, proxy: Option<&str>) -> Result<(), curl::Error> {
        easy.follow_location(true)?;
        if let Some(p) = proxy {
            easy.proxy(p)?;
        }
        if let Some(t) = self.connect_timeout {
            easy.connect_timeout(t)?;
        }
        if let Some(t) = self.fetch_timeout {
            easy.timeout(t)?;
        }
        if let Some(ls) = self.low_speed {
            easy.low_speed_limit(ls.bytes_per_sec)?;
            easy.low_speed_time(ls.window)?;
        }
        Ok(())
    }
}
