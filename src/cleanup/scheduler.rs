//! Deferred best-effort deletion of streamed files
//!
//! A single actor receives [`CleanupCommand`]s and gives every scheduled
//! file its own timer task, so a long delay never holds up the request that
//! scheduled it or any other deletion.

use super::messages::CleanupCommand;
use crate::workdir::WorkDir;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct Ledger {
    scheduled: AtomicUsize,
    pending: Mutex<HashSet<PathBuf>>,
}

impl Ledger {
    fn insert(&self, path: &Path) {
        self.scheduled.fetch_add(1, Ordering::SeqCst);
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_path_buf());
    }

    fn remove(&self, path: &Path) {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(path);
    }
}

/// Cloneable, non-blocking front end of the cleanup actor
#[derive(Debug, Clone)]
pub struct CleanupHandle {
    sender: mpsc::UnboundedSender<CleanupCommand>,
    ledger: Arc<Ledger>,
}

impl CleanupHandle {
    /// Queue `path` for deletion after the configured delay. Never blocks.
    pub fn schedule(&self, path: PathBuf, workdir: Option<WorkDir>) {
        self.ledger.insert(&path);
        if let Err(mpsc::error::SendError(cmd)) =
            self.sender.send(CleanupCommand::Schedule { path, workdir })
        {
            // Actor gone: the guard drops here and takes the directory with it.
            if let CleanupCommand::Schedule { path, .. } = cmd {
                warn!("Cleanup scheduler stopped, dropping {}", path.display());
                self.ledger.remove(&path);
            }
        }
    }

    /// Stop accepting new work. Already scheduled deletions still run.
    pub fn shutdown(&self) {
        let _ = self.sender.send(CleanupCommand::Shutdown);
    }

    /// Number of cleanup tasks scheduled since start
    pub fn scheduled(&self) -> usize {
        self.ledger.scheduled.load(Ordering::SeqCst)
    }

    /// Whether `path` is still waiting for its timer
    pub fn is_pending(&self, path: &Path) -> bool {
        self.ledger
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(path)
    }

}

pub struct CleanupScheduler {
    receiver: mpsc::UnboundedReceiver<CleanupCommand>,
    ledger: Arc<Ledger>,
    delay: Duration,
}

impl CleanupScheduler {
    pub fn new(delay: Duration) -> (Self, CleanupHandle) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let ledger = Arc::new(Ledger::default());
        let handle = CleanupHandle {
            sender,
            ledger: ledger.clone(),
        };
        let scheduler = Self {
            receiver,
            ledger,
            delay,
        };
        (scheduler, handle)
    }

    /// Build the actor and spawn it on the current runtime
    pub fn spawn(delay: Duration) -> CleanupHandle {
        let (scheduler, handle) = Self::new(delay);
        tokio::spawn(scheduler.run());
        handle
    }

    pub async fn run(mut self) {
        info!("Cleanup scheduler started (delay {:?})", self.delay);

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                CleanupCommand::Schedule { path, workdir } => {
                    let delay = self.delay;
                    let ledger = self.ledger.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        remove_quietly(&path).await;
                        drop(workdir);
                        ledger.remove(&path);
                    });
                }
                CleanupCommand::Shutdown => {
                    info!("Cleanup scheduler shutting down");
                    break;
                }
            }
        }
    }
}

/// Delete once; any failure (including "already gone") is swallowed.
async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) => debug!("Ignoring cleanup failure for {}: {}", path.display(), e),
    }
}
