use crate::extractor::models::{MediaKind, ProducedFile};
use crate::utils::error::ExtractionError;
use async_trait::async_trait;
use std::path::Path;

/// Core trait for media extraction backends
///
/// This trait isolates the request handler from the specific tool doing the
/// work (yt-dlp process, an in-process library, a test double).
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Returns a unique identifier for this extractor (e.g., "ytdlp")
    fn id(&self) -> &'static str;

    /// Resolves `url`, downloads the best matching stream(s) into
    /// `output_dir` and converts them to `kind`'s container.
    ///
    /// On success exactly one file exists in `output_dir` and its path and
    /// size are returned.
    async fn extract(
        &self,
        url: &str,
        kind: MediaKind,
        output_dir: &Path,
    ) -> Result<ProducedFile, ExtractionError>;
}
