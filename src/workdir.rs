//! Per-request scratch directories
//!
//! Every download gets its own uniquely named directory. The guard removes
//! it recursively when dropped, whichever way the request ends.

use std::io;
use std::path::Path;
use tempfile::TempDir;
use tracing::debug;
use uuid::Uuid;

/// Exclusive working directory of one request
#[derive(Debug)]
pub struct WorkDir {
    dir: TempDir,
}

impl WorkDir {
    /// Create `<root>/tubegate-<request_id>-XXXXXX` on the blocking pool
    pub async fn create(root: &Path, request_id: Uuid) -> io::Result<Self> {
        let root = root.to_path_buf();
        let dir = tokio::task::spawn_blocking(move || {
            std::fs::create_dir_all(&root)?;
            tempfile::Builder::new()
                .prefix(&format!("tubegate-{}-", request_id))
                .tempdir_in(&root)
        })
        .await
        .map_err(io::Error::other)??;

        debug!("Created working directory {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unique_per_request() {
        let root = TempDir::new().unwrap();
        let a = WorkDir::create(root.path(), Uuid::new_v4()).await.unwrap();
        let b = WorkDir::create(root.path(), Uuid::new_v4()).await.unwrap();
        assert_ne!(a.path(), b.path());
        assert!(a.path().starts_with(root.path()));
        assert!(a
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("tubegate-"));
    }

    #[tokio::test]
    async fn test_removed_on_drop() {
        let root = TempDir::new().unwrap();
        let work = WorkDir::create(root.path(), Uuid::new_v4()).await.unwrap();
        std::fs::create_dir(work.path().join("nested")).unwrap();
        std::fs::write(work.path().join("nested/file.mp3"), b"data").unwrap();
        let path = work.path().to_path_buf();

        drop(work);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_root_that_is_a_file_fails() {
        let root = TempDir::new().unwrap();
        let file_root = root.path().join("not-a-dir");
        std::fs::write(&file_root, b"x").unwrap();

        assert!(WorkDir::create(&file_root, Uuid::new_v4()).await.is_err());
    }
}
