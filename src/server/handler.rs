//! Per-request download orchestration
//!
//! validate → working directory → extract → size check → stream → schedule
//! cleanup. Each step runs strictly after the previous one; the size check
//! happens before any body byte leaves the process.

use crate::extractor::MediaKind;
use crate::server::state::AppState;
use crate::utils::error::GatewayError;
use crate::workdir::WorkDir;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio_util::io::ReaderStream;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Raw query pairs, in request order. Repeated keys are kept.
pub type QueryPairs = Vec<(String, String)>;

/// `GET /download/song?url=...`
pub async fn download_song(
    State(state): State<AppState>,
    Query(pairs): Query<QueryPairs>,
) -> Response {
    download(&state, MediaKind::Audio, &pairs).await
}

/// `GET /download/video?url=...`
pub async fn download_video(
    State(state): State<AppState>,
    Query(pairs): Query<QueryPairs>,
) -> Response {
    download(&state, MediaKind::Video, &pairs).await
}

/// First `url` value, trimmed. Later duplicates are ignored; an empty first
/// value counts as absent.
pub fn first_url(pairs: &[(String, String)]) -> Option<&str> {
    pairs
        .iter()
        .find(|(key, _)| key == "url")
        .map(|(_, value)| value.trim())
        .filter(|url| !url.is_empty())
}

/// Run one download and convert every failure into a JSON error response.
pub async fn download(state: &AppState, kind: MediaKind, pairs: &[(String, String)]) -> Response {
    let request_id = Uuid::new_v4();
    let span = info_span!("download", %request_id, kind = kind.label());

    match handle(state, kind, pairs, request_id).instrument(span).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn handle(
    state: &AppState,
    kind: MediaKind,
    pairs: &[(String, String)],
    request_id: Uuid,
) -> Result<Response, GatewayError> {
    let url = first_url(pairs).ok_or(GatewayError::MissingUrl)?;

    info!(url, "Download requested");

    // Dropped on every early return below, which removes the directory.
    let workdir = WorkDir::create(&state.settings.work_root, request_id)
        .await
        .map_err(|source| GatewayError::Io { kind, source })?;

    let produced = state
        .extractor
        .extract(url, kind, workdir.path())
        .await
        .map_err(|source| {
            warn!(
                extractor = state.extractor.id(),
                error_kind = %source.kind,
                "Extraction failed: {}",
                source
            );
            GatewayError::Extraction { kind, source }
        })?;

    let size = produced.size;
    let max_mb = state.settings.max_file_size_mb;
    if size > state.settings.max_file_size_bytes() {
        warn!(size, max_mb, "Produced file exceeds size ceiling");
        return Err(GatewayError::FileTooLarge {
            size_mb: produced.size_mb(),
            max_mb,
        });
    }

    let file = tokio::fs::File::open(&produced.path)
        .await
        .map_err(|source| GatewayError::Io { kind, source })?;

    let filename = produced.file_name();
    let headers = attachment_headers(kind, &filename, size);
    let body = Body::from_stream(ReaderStream::new(file));

    // The guard moves into the scheduler so the file outlives this scope.
    state.cleanup.schedule(produced.path.clone(), Some(workdir));

    info!(filename = %filename, size, "Streaming produced file");
    Ok((StatusCode::OK, headers, body).into_response())
}

fn attachment_headers(kind: MediaKind, filename: &str, size: u64) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(kind.content_type()));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&content_disposition(filename))
            .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
    );
    headers
}

/// `attachment` disposition with an ASCII fallback plus RFC 5987 `filename*`.
pub fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(filename)
    )
}
