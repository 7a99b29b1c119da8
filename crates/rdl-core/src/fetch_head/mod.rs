//! HTTP HEAD probing.
//!
//! Uses the curl crate (libcurl) to fetch response headers and confirm
//! `Content-Length` and `Accept-Ranges: bytes` before any piece is fetched.
//! ETag/Last-Modified are captured for logging.

mod parse;

use std::str;

use crate::fetch::HttpOptions;

/// Key headers of a HEAD response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadResult {
    /// Total size in bytes, if `Content-Length` is present.
    pub content_length: Option<u64>,
    /// True if the server sent `Accept-Ranges: bytes`.
    pub accept_ranges: bool,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error(transparent)]
    Curl(#[from] curl::Error),
    #[error("HEAD returned HTTP {0}")]
    Http(u32),
}

/// Performs a HEAD request through the first configured proxy.
///
/// Follows redirects; with redirects only the final response's headers are
/// kept. Blocks the current thread.
pub fn probe(url: &str, http: &HttpOptions) -> Result<HeadResult, ProbeError> {
    let mut headers: Vec<String> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.nobody(true)?; // HEAD request
    http.apply(&mut easy, http.proxies.primary())?;

    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                let line = s.trim_end();
                // A new status line starts the next response in a redirect chain.
                if line.starts_with("HTTP/") {
                    headers.clear();
                }
                headers.push(line.to_string());
            }
            true
        })?;
        transfer.perform()?;
    }

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(ProbeError::Http(code));
    }

    Ok(parse::parse_headers(&headers))
}
