use crate::cleanup::CleanupScheduler;
use crate::extractor::Extractor;
use crate::server::handler::{download_song, download_video};
use crate::server::state::AppState;
use crate::utils::config::AppSettings;
use crate::utils::error::GatewayError;
use anyhow::{Context, Result};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::any::Any;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tracing::{error, info};

pub const INDEX_HTML: &str = r#"
<h2>YouTube Downloader API</h2>
<p>Use <code>/download/song?url=VIDEO_URL</code> to download audio (MP3)</p>
<p>Use <code>/download/video?url=VIDEO_URL</code> to download video (MP4)</p>
"#;

/// `GET /`
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Register all routes on a fresh router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/download/song", get(download_song))
        .route("/download/video", get(download_video))
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(state)
}

/// Turn a handler panic into the usual JSON 500 without leaking the payload.
fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Request handler panicked: {}", detail);
    GatewayError::Internal.into_response()
}

/// Bind, serve until Ctrl-C, then stop the cleanup scheduler.
pub async fn serve(settings: AppSettings, extractor: Arc<dyn Extractor>) -> Result<()> {
    settings.validate().context("invalid configuration")?;
    let addr = settings.bind_addr()?;

    info!("Using extractor: {}", extractor.id());
    let cleanup = CleanupScheduler::spawn(settings.cleanup_delay);
    let state = AppState::new(settings, extractor, cleanup.clone());
    let router = build_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    cleanup.shutdown();
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
