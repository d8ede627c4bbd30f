//! Data structures exchanged with the extraction backend

use std::fmt;
use std::path::PathBuf;

pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// What the caller asked for: audio-only or muxed audio+video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    /// File extension of the finished artifact (without the dot)
    pub fn extension(&self) -> &'static str {
        match self {
            MediaKind::Audio => "mp3",
            MediaKind::Video => "mp4",
        }
    }

    /// MIME type sent with the attachment
    pub fn content_type(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio/mpeg",
            MediaKind::Video => "video/mp4",
        }
    }

    /// Human label used in log lines and error messages
    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The finished media file sitting inside a request's working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducedFile {
    pub path: PathBuf,
    pub size: u64,
}

impl ProducedFile {
    /// Final path component, falling back to a generic name
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "download".to_string())
    }

    /// Size in mebibytes, as reported in size-limit errors
    pub fn size_mb(&self) -> f64 {
        self.size as f64 / BYTES_PER_MB as f64
    }
}
