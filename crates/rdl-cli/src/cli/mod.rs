//! CLI for the rdl resumable downloader.

use anyhow::Result;
use clap::Parser;
use rdl_core::config::{self, RdlConfig};
use rdl_core::progress::{format_bytes, ProgressSink};
use rdl_core::session::{self, DownloadRequest};
use std::path::PathBuf;

/// Resumable multi-worker HTTP range downloader.
///
/// Values not given on the command line come from `~/.config/rdl/config.toml`.
#[derive(Debug, Parser)]
#[command(name = "rdl")]
#[command(about = "rdl: resumable multi-worker HTTP range downloader", long_about = None)]
pub struct Cli {
    /// URL of the resource (the server must accept byte ranges).
    #[arg(short = 'u', long)]
    pub url: String,

    /// Record file used to resume (default: <file>_record.json).
    #[arg(short = 'r', long = "record", value_name = "PATH")]
    pub record: Option<PathBuf>,

    /// Output file name (default: last segment of the URL path).
    #[arg(short = 'f', long = "file", value_name = "NAME")]
    pub file: Option<PathBuf>,

    /// Number of concurrent workers.
    #[arg(short = 'n', long = "workers", value_name = "N")]
    pub workers: Option<usize>,

    /// Piece size in MiB for a new download. Ignored when resuming.
    #[arg(short = 'b', long = "block-size", value_name = "MiB")]
    pub block_size: Option<u64>,

    /// Proxies, pipe-delimited; worker i uses entry i mod count.
    #[arg(short = 'p', long = "proxy", value_name = "LIST")]
    pub proxy: Option<String>,

    /// Attempts before giving up.
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,

    /// Pause after each piece dispatch, in milliseconds (0 disables it).
    #[arg(long, value_name = "MS")]
    pub dispatch_delay_ms: Option<u64>,

    /// Abort a single piece fetch after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub fetch_timeout_secs: Option<u64>,

    /// Do not draw the progress line.
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

impl Cli {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let mut cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        cli.apply_to(&mut cfg);
        cfg.validate()?;

        let req = cli.into_request(&cfg);
        let report = session::download(&req)?;
        eprintln!(
            "downloaded {} in {} piece(s), {} attempt(s)",
            format_bytes(report.total_bytes),
            report.pieces,
            report.attempts
        );
        Ok(())
    }

    /// Overrides config values with the flags that were given.
    pub fn apply_to(&self, cfg: &mut RdlConfig) {
        if let Some(n) = self.workers {
            cfg.workers = n;
        }
        if let Some(b) = self.block_size {
            cfg.block_size_mib = b;
        }
        if let Some(p) = &self.proxy {
            cfg.proxy = Some(p.clone());
        }
        if let Some(n) = self.max_attempts {
            cfg.max_attempts = n;
        }
        if let Some(ms) = self.dispatch_delay_ms {
            cfg.dispatch_delay_ms = ms;
        }
        if let Some(secs) = self.fetch_timeout_secs {
            cfg.fetch_timeout_secs = Some(secs);
        }
    }

    pub fn into_request(self, cfg: &RdlConfig) -> DownloadRequest {
        let sink = if self.quiet {
            ProgressSink::Hidden
        } else {
            ProgressSink::Stderr
        };
        DownloadRequest {
            url: self.url,
            file_name: self.file,
            record_path: self.record,
            block_size: cfg.block_size_bytes(),
            http: cfg.http_options(),
            options: cfg.download_options(sink),
        }
    }
}
