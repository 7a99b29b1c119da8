//! libcurl range GET for one piece.

use std::cell::Cell;

use super::{FetchError, HttpOptions, PieceFetcher};
use crate::worker::PieceTask;

/// Fetches pieces of `url` with HTTP Range GETs, one curl handle per fetch.
#[derive(Debug, Clone)]
pub struct CurlFetcher {
    url: String,
    http: HttpOptions,
}

impl CurlFetcher {
    pub fn new(url: impl Into<String>, http: HttpOptions) -> Self {
        CurlFetcher {
            url: url.into(),
            http,
        }
    }
}

impl PieceFetcher for CurlFetcher {
    fn fetch(
        &self,
        worker: usize,
        task: &PieceTask,
        sink: &mut dyn FnMut(&[u8]) -> Result<(), FetchError>,
    ) -> Result<(), FetchError> {
        let mut easy = curl::easy::Easy::new();
        easy.url(&self.url)?;
        self.http.apply(&mut easy, self.http.proxies.for_worker(worker))?;
        // curl wants "start-end" (inclusive) without the "bytes=" prefix.
        easy.range(&format!("{}-{}", task.start, task.end_inclusive()))?;

        let status = Cell::new(None::<u32>);
        let mut received = 0u64;
        let mut sink_error: Option<FetchError> = None;

        let perform_result = {
            let mut transfer = easy.transfer();
            transfer.header_function(|line| {
                if let Some(code) = parse_status_line(line) {
                    status.set(Some(code));
                }
                true
            })?;
            transfer.write_function(|data| {
                // Never write an error page into the file.
                if let Some(code) = status.get().filter(|c| !(200..300).contains(c)) {
                    sink_error = Some(FetchError::Http(code));
                    return Ok(0);
                }
                let n = data.len() as u64;
                if received + n > task.len {
                    sink_error = Some(FetchError::Overrun { limit: task.len });
                    return Ok(0);
                }
                match sink(data) {
                    Ok(()) => {
                        received += n;
                        Ok(data.len())
                    }
                    Err(e) => {
                        sink_error = Some(e);
                        Ok(0)
                    }
                }
            })?;
            transfer.perform()
        };

        if let Err(e) = perform_result {
            if e.is_write_error() {
                if let Some(err) = sink_error.take() {
                    return Err(err);
                }
            }
            return Err(FetchError::Curl(e));
        }

        let code = easy.response_code()?;
        if !(200..300).contains(&code) {
            return Err(FetchError::Http(code));
        }
        if received != task.len {
            return Err(FetchError::PartialTransfer {
                expected: task.len,
                received,
            });
        }
        Ok(())
    }
}

/// Status code from a header line like `HTTP/1.1 206 Partial Content`.
fn parse_status_line(line: &[u8]) -> Option<u32> {
    let line = std::str::from_utf8(line).ok()?;
    if !line.starts_with("HTTP/") {
        return None;
    }
    line.split_whitespace().nth(1)?.parse().ok()
}
