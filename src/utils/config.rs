//! Process-wide gateway configuration
//!
//! Built once at startup from the command line and frozen for the lifetime
//! of the process.

use crate::extractor::models::BYTES_PER_MB;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Gateway settings
#[derive(Debug, Clone)]
pub struct AppSettings {
    /// Interface to bind
    pub host: String,

    /// TCP port to listen on
    pub port: u16,

    /// Largest produced file that will be streamed back (MiB)
    pub max_file_size_mb: u64,

    /// Delay before a streamed file is deleted
    pub cleanup_delay: Duration,

    /// Parent directory for per-request working directories
    pub work_root: PathBuf,

    /// Explicit yt-dlp binary; `None` searches PATH and common locations
    pub ytdlp_path: Option<PathBuf>,

    /// Upper bound on a single extraction; `None` waits indefinitely
    pub extract_timeout: Option<Duration>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 1000,
            max_file_size_mb: 1000,
            cleanup_delay: Duration::from_secs(30),
            work_root: std::env::temp_dir(),
            ytdlp_path: None,
            extract_timeout: None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("port must be non-zero")]
    ZeroPort,

    #[error("max file size must be at least 1MB")]
    ZeroCeiling,

    #[error("invalid bind address {0}")]
    InvalidAddress(String),
}

impl AppSettings {
    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        if self.max_file_size_mb == 0 {
            return Err(ConfigError::ZeroCeiling);
        }
        self.bind_addr().map(|_| ())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|_| ConfigError::InvalidAddress(raw))
    }

    /// Ceiling in bytes
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(BYTES_PER_MB)
    }
}
