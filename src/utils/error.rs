//! Error handling for tubegate

use crate::extractor::MediaKind;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Broad category of an extraction failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionErrorKind {
    /// yt-dlp binary could not be located
    ToolMissing,
    /// The process could not be started
    Spawn,
    UnsupportedUrl,
    Network,
    /// ffmpeg conversion or muxing failed
    Postprocess,
    Timeout,
    /// The tool reported success but left no usable file behind
    OutputMissing,
    Other,
}

impl fmt::Display for ExtractionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExtractionErrorKind::ToolMissing => "tool missing",
            ExtractionErrorKind::Spawn => "spawn",
            ExtractionErrorKind::UnsupportedUrl => "unsupported url",
            ExtractionErrorKind::Network => "network",
            ExtractionErrorKind::Postprocess => "postprocess",
            ExtractionErrorKind::Timeout => "timeout",
            ExtractionErrorKind::OutputMissing => "output missing",
            ExtractionErrorKind::Other => "other",
        };
        f.write_str(s)
    }
}

/// Structured failure returned by an [`Extractor`](crate::extractor::Extractor)
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ExtractionError {
    pub kind: ExtractionErrorKind,
    pub message: String,
}

impl ExtractionError {
    pub fn new(kind: ExtractionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Errors surfaced to HTTP callers
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Missing \"url\" parameter")]
    MissingUrl,

    #[error("File too large ({size_mb:.2}MB), max is {max_mb}MB")]
    FileTooLarge { size_mb: f64, max_mb: u64 },

    #[error("Failed to download {kind}: {source}")]
    Extraction {
        kind: MediaKind,
        #[source]
        source: ExtractionError,
    },

    #[error("Failed to download {kind}: {source}")]
    Io {
        kind: MediaKind,
        #[source]
        source: std::io::Error,
    },

    /// A handler panicked; details stay in the log
    #[error("Internal server error")]
    Internal,
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::MissingUrl | GatewayError::FileTooLarge { .. } => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::Extraction { .. }
            | GatewayError::Io { .. }
            | GatewayError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
