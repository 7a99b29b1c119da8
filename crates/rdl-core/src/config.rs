use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::coordinator::DownloadOptions;
use crate::error::SetupError;
use crate::fetch::{HttpOptions, LowSpeedLimit, ProxyList};
use crate::progress::ProgressSink;
use crate::retry::{AttemptPolicy, DEFAULT_MAX_ATTEMPTS};

const MIB: u64 = 1024 * 1024;

/// Low-speed abort (optional `[low_speed]` section in config.toml).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowSpeedConfig {
    /// Abort a piece fetch slower than this many bytes per second...
    pub bytes_per_sec: u32,
    /// ...for this many seconds.
    pub window_secs: u64,
}

/// Global configuration loaded from `~/.config/rdl/config.toml`.
///
/// Every field has a default, so a partial file is valid. CLI flags override
/// whatever is loaded here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RdlConfig {
    /// Concurrent workers per download.
    pub workers: usize,
    /// Piece size for new downloads, in MiB. Resumed downloads keep the
    /// block size stored in their record.
    pub block_size_mib: u64,
    /// Attempts before the download is reported as failed.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub attempt_delay_ms: u64,
    /// Pause after each piece dispatch; 0 disables it.
    pub dispatch_delay_ms: u64,
    pub progress_interval_ms: u64,
    /// Failed-piece reschedules allowed inside one attempt.
    pub piece_retries_per_attempt: u32,
    pub connect_timeout_secs: Option<u64>,
    /// Limit for one whole piece fetch (None = no limit).
    pub fetch_timeout_secs: Option<u64>,
    /// Pipe-delimited proxy list, e.g. `http://a:3128|socks5://b:1080`.
    pub proxy: Option<String>,
    pub low_speed: Option<LowSpeedConfig>,
}

impl Default for RdlConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            block_size_mib: 4,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            attempt_delay_ms: 0,
            dispatch_delay_ms: 1000,
            progress_interval_ms: 1000,
            piece_retries_per_attempt: 2,
            connect_timeout_secs: Some(30),
            fetch_timeout_secs: None,
            proxy: None,
            low_speed: None,
        }
    }
}

impl RdlConfig {
    /// Rejects values the downloader cannot run with.
    pub fn validate(&self) -> Result<(), SetupError> {
        if self.workers == 0 {
            return Err(SetupError::InvalidConfig("workers must be at least 1".into()));
        }
        if self.block_size_mib == 0 {
            return Err(SetupError::InvalidConfig("block_size_mib must be at least 1".into()));
        }
        if self.max_attempts == 0 {
            return Err(SetupError::InvalidConfig("max_attempts must be at least 1".into()));
        }
        if self.progress_interval_ms == 0 {
            return Err(SetupError::InvalidConfig(
                "progress_interval_ms must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn block_size_bytes(&self) -> u64 {
        self.block_size_mib.saturating_mul(MIB)
    }

    pub fn download_options(&self, progress_sink: ProgressSink) -> DownloadOptions {
        DownloadOptions {
            workers: self.workers,
            dispatch_delay: Duration::from_millis(self.dispatch_delay_ms),
            progress_interval: Duration::from_millis(self.progress_interval_ms),
            progress_sink,
            attempts: AttemptPolicy {
                max_attempts: self.max_attempts,
                delay: Duration::from_millis(self.attempt_delay_ms),
            },
            piece_retries_per_attempt: self.piece_retries_per_attempt,
        }
    }

    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            proxies: self
                .proxy
                .as_deref()
                .map(ProxyList::parse)
                .unwrap_or_default(),
            connect_timeout: self.connect_timeout_secs.map(Duration::from_secs),
            fetch_timeout: self.fetch_timeout_secs.map(Duration::from_secs),
            low_speed: self.low_speed.map(|ls| LowSpeedLimit {
                bytes_per_sec: ls.bytes_per_sec,
                window: Duration::from_secs(ls.window_secs),
            }),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("rdl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<RdlConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = RdlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: RdlConfig = toml::from_str(&data)?;
    Ok(cfg)
}
