//! Output file naming from the download URL.

use percent_encoding::percent_decode_str;
use std::path::PathBuf;

/// Used when the URL path ends without a usable segment.
pub const FALLBACK_FILE_NAME: &str = "download.bin";

const NAME_MAX: usize = 255;

/// Output file name for `url`: its last path segment, percent-decoded and
/// sanitized, or [`FALLBACK_FILE_NAME`].
pub fn derive_file_name(url: &url::Url) -> PathBuf {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .map(|s| sanitize_segment(&percent_decode_str(s).decode_utf8_lossy()))
        .filter(|s| !s.is_empty());
    PathBuf::from(segment.unwrap_or_else(|| FALLBACK_FILE_NAME.to_string()))
}

/// Makes one URL path segment safe as a local file name: separators, control
/// characters and whitespace become `_` (runs collapsed), leading and trailing
/// dots or underscores are dropped, and the result fits in `NAME_MAX` bytes.
pub fn sanitize_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for c in segment.chars() {
        let unsafe_char = matches!(c, '/' | '\\') || c.is_control() || c.is_whitespace();
        if !unsafe_char {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    let mut end = trimmed.len().min(NAME_MAX);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end].to_string()
}
