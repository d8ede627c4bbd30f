//! tubegate library

pub mod cleanup;
pub mod extractor;
pub mod server;
pub mod utils;
pub mod workdir;

// Re-export main types for easier use
pub use cleanup::{CleanupHandle, CleanupScheduler};
pub use extractor::{Extractor, MediaKind, ProducedFile, YtDlpExtractor};
pub use server::{build_router, AppState};
pub use utils::{AppSettings, ExtractionError, ExtractionErrorKind, GatewayError};
pub use workdir::WorkDir;
