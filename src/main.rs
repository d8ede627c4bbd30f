//! tubegate - HTTP gateway in front of yt-dlp
//!
//! Accepts a media URL, lets yt-dlp fetch and convert it, streams the result
//! back as an attachment and deletes it shortly afterwards.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tubegate::extractor::YtDlpExtractor;
use tubegate::server;
use tubegate::utils::AppSettings;

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Interface to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 1000)]
    port: u16,

    /// Largest file (MB) that will be returned
    #[arg(long, default_value_t = 1000)]
    max_file_size_mb: u64,

    /// Seconds to keep a streamed file before deleting it
    #[arg(long, default_value_t = 30)]
    cleanup_delay_secs: u64,

    /// Parent directory for per-request working directories
    #[arg(long)]
    work_root: Option<PathBuf>,

    /// Path to the yt-dlp binary
    #[arg(long)]
    ytdlp: Option<PathBuf>,

    /// Abort an extraction after this many seconds (off by default)
    #[arg(long)]
    extract_timeout_secs: Option<u64>,
}

impl Args {
    fn into_settings(self) -> AppSettings {
        let defaults = AppSettings::default();
        AppSettings {
            host: self.host,
            port: self.port,
            max_file_size_mb: self.max_file_size_mb,
            cleanup_delay: Duration::from_secs(self.cleanup_delay_secs),
            work_root: self.work_root.unwrap_or(defaults.work_root),
            ytdlp_path: self.ytdlp,
            extract_timeout: self.extract_timeout_secs.map(Duration::from_secs),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = args.into_settings();
    let extractor = Arc::new(YtDlpExtractor::new(
        settings.ytdlp_path.clone(),
        settings.extract_timeout,
    ));

    server::serve(settings, extractor).await
}
