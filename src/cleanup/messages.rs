use crate::workdir::WorkDir;
use std::path::PathBuf;

/// Commands accepted by the cleanup actor
#[derive(Debug)]
pub enum CleanupCommand {
    /// Delete `path` once the configured delay has elapsed. The working
    /// directory guard is held until then and dropped right after.
    Schedule {
        path: PathBuf,
        workdir: Option<WorkDir>,
    },
    // System
    Shutdown,
}
