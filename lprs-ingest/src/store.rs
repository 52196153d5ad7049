//! On-disk copies of payloads and images
//!
//! Layout below the data directory (read directly by external tools, keep stable):
//! - `json/{event_id}_{name}`
//! - `images/{image_id}_{name}`
//!
//! Every name embeds a database id that is never reused, so no two writers
//! ever target the same path and no file locking is needed.

use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, warn};

const JSON_DIR: &str = "json";
const IMAGES_DIR: &str = "images";

/// Which subdirectory a file lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Json,
    Image,
}

impl FileKind {
    fn dir_name(self) -> &'static str {
        match self {
            FileKind::Json => JSON_DIR,
            FileKind::Image => IMAGES_DIR,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DataStore {
    root: PathBuf,
}

impl DataStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: data_dir.into(),
        }
    }

    pub fn path_for(&self, kind: FileKind, file_name: &str) -> PathBuf {
        self.root.join(kind.dir_name()).join(file_name)
    }

    /// Create the `json/` and `images/` subdirectories if missing
    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(self.root.join(JSON_DIR)).await?;
        tokio::fs::create_dir_all(self.root.join(IMAGES_DIR)).await
    }

    pub async fn write(&self, kind: FileKind, file_name: &str, data: &[u8]) -> std::io::Result<()> {
        let path = self.path_for(kind, file_name);
        tokio::fs::write(&path, data).await?;
        debug!(path = %path.display(), bytes = data.len(), "wrote file");
        Ok(())
    }

    pub async fn read(&self, kind: FileKind, file_name: &str) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(self.path_for(kind, file_name)).await
    }

    /// Best-effort delete; a missing file counts as removed
    ///
    /// Returns false only when the file existed and could not be deleted.
    pub async fn remove(&self, kind: FileKind, file_name: &str) -> bool {
        let path = self.path_for(kind, file_name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => true,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to remove file");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_read_remove() {
        let temp_dir = TempDir::new().unwrap();
        let store = DataStore::new(temp_dir.path());
        store.ensure_dirs().await.unwrap();

        store.write(FileKind::Image, "1_a.jpg", b"abc").await.unwrap();
        assert_eq!(store.read(FileKind::Image, "1_a.jpg").await.unwrap(), b"abc");
        assert!(store.path_for(FileKind::Image, "1_a.jpg").starts_with(temp_dir.path().join("images")));

        assert!(store.remove(FileKind::Image, "1_a.jpg").await);
        assert!(!store.path_for(FileKind::Image, "1_a.jpg").exists());
    }

    #[tokio::test]
    async fn test_remove_missing_file_is_not_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = DataStore::new(temp_dir.path());
        store.ensure_dirs().await.unwrap();

        assert!(store.remove(FileKind::Json, "404_missing.json").await);
    }

    #[tokio::test]
    async fn test_write_fails_without_directories() {
        let temp_dir = TempDir::new().unwrap();
        let store = DataStore::new(temp_dir.path().join("absent"));

        assert!(store.write(FileKind::Json, "1_x.json", b"{}").await.is_err());
    }
}
