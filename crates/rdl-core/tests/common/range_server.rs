//! Minimal HTTP/1.1 server for integration tests: HEAD plus Range GET over a
//! single static body, one request per connection.
//!
//! Behaviour is tunable per test (missing headers, ignored ranges, failing
//! GETs), and every GET range is recorded so tests can assert what was fetched.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RangeServerOptions {
    /// Status returned for HEAD; anything but 200 makes setup fail.
    pub head_status: u16,
    /// Send `Accept-Ranges: bytes`.
    pub advertise_ranges: bool,
    /// Send `Content-Length` on HEAD.
    pub head_content_length: bool,
    /// If false, GET ignores Range and returns 200 with the full body.
    pub honour_ranges: bool,
    /// The first N GETs get a 500.
    pub fail_first_gets: usize,
}

impl Default for RangeServerOptions {
    fn default() -> Self {
        Self {
            head_status: 200,
            advertise_ranges: true,
            head_content_length: true,
            honour_ranges: true,
            fail_first_gets: 0,
        }
    }
}

/// Handle to a running server. The server lives until the process exits.
#[derive(Clone)]
pub struct RangeServer {
    pub url: String,
    gets: Arc<AtomicUsize>,
    ranges: Arc<Mutex<Vec<(u64, u64)>>>,
}

impl RangeServer {
    /// Number of GET requests received (including failed ones).
    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Ranges requested by successful GETs, sorted by start.
    pub fn served_ranges(&self) -> Vec<(u64, u64)> {
        let mut v = self.ranges.lock().unwrap().clone();
        v.sort_unstable();
        v
    }
}

pub fn start(body: Vec<u8>) -> RangeServer {
    start_with_options(body, RangeServerOptions::default())
}

/// Serves `body` at `http://127.0.0.1:<port>/<file>` for any path.
pub fn start_with_options(body: Vec<u8>, opts: RangeServerOptions) -> RangeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let server = RangeServer {
        url: format!("http://127.0.0.1:{}/files/payload.bin", port),
        gets: Arc::new(AtomicUsize::new(0)),
        ranges: Arc::new(Mutex::new(Vec::new())),
    };
    let body = Arc::new(body);
    let shared = server.clone();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let shared = shared.clone();
            thread::spawn(move || handle(stream, &body, opts, &shared));
        }
    });
    server
}

fn handle(mut stream: TcpStream, body: &[u8], opts: RangeServerOptions, server: &RangeServer) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let Some(request) = read_head(&mut stream) else {
        return;
    };
    let (method, range) = parse_request(&request);
    let total = body.len() as u64;
    let accept_ranges = if opts.advertise_ranges {
        "Accept-Ranges: bytes\r\n"
    } else {
        ""
    };

    if method.eq_ignore_ascii_case("HEAD") {
        let length = if opts.head_content_length {
            format!("Content-Length: {}\r\n", total)
        } else {
            String::new()
        };
        let response = format!(
            "HTTP/1.1 {} {}\r\n{}{}Connection: close\r\n\r\n",
            opts.head_status,
            reason(opts.head_status),
            length,
            accept_ranges
        );
        let _ = stream.write_all(response.as_bytes());
        return;
    }

    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n");
        return;
    }

    let nth = server.gets.fetch_add(1, Ordering::SeqCst);
    if nth < opts.fail_first_gets {
        let _ = stream.write_all(
            b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 5\r\nConnection: close\r\n\r\noops!",
        );
        return;
    }

    let (status, slice) = match range {
        Some((start, end_incl)) if opts.honour_ranges => {
            let end_incl = end_incl.min(total.saturating_sub(1));
            if start > end_incl {
                let response = format!(
                    "HTTP/1.1 416 Range Not Satisfiable\r\nContent-Range: bytes */{}\r\nContent-Length: 0\r\n\r\n",
                    total
                );
                let _ = stream.write_all(response.as_bytes());
                return;
            }
            server.ranges.lock().unwrap().push((start, end_incl));
            (
                format!("206 Partial Content\r\nContent-Range: bytes {}-{}/{}", start, end_incl, total),
                &body[start as usize..=end_incl as usize],
            )
        }
        _ => ("200 OK".to_string(), body),
    };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n",
        status,
        slice.len(),
        accept_ranges
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.write_all(slice);
}

/// Reads until the end of the request headers.
fn read_head(stream: &mut TcpStream) -> Option<String> {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    while !data.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buf[..n]);
    }
    String::from_utf8(data).ok()
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        403 => "Forbidden",
        404 => "Not Found",
        _ => "Error",
    }
}

/// Returns (method, optional (start, end_inclusive) for `Range: bytes=X-Y`).
fn parse_request(request: &str) -> (&str, Option<(u64, u64)>) {
    let mut lines = request.lines();
    let method = lines
        .next()
        .and_then(|l| l.split_whitespace().next())
        .unwrap_or("");
    let range = lines
        .take_while(|l| !l.trim().is_empty())
        .filter_map(|l| l.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("range"))
        .and_then(|(_, value)| {
            let bytes = value.trim().strip_prefix("bytes=")?;
            let (a, b) = bytes.split_once('-')?;
            let start = a.trim().parse().ok()?;
            let end = match b.trim() {
                "" => u64::MAX,
                e => e.parse().ok()?,
            };
            Some((start, end))
        });
    (method, range)
}
