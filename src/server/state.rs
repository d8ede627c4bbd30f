use crate::cleanup::CleanupHandle;
use crate::extractor::Extractor;
use crate::utils::config::AppSettings;
use std::sync::Arc;

/// Everything a request handler needs, shared read-only across requests
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<AppSettings>,
    pub extractor: Arc<dyn Extractor>,
    pub cleanup: CleanupHandle,
}

impl AppState {
    pub fn new(
        settings: AppSettings,
        extractor: Arc<dyn Extractor>,
        cleanup: CleanupHandle,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            extractor,
            cleanup,
        }
    }
}
