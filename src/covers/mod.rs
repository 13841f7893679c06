//! Cover image storage
//!
//! Uploaded covers live as flat files under a configured directory and are
//! served statically. Stored names are freshly generated UUIDs, so a record
//! update never overwrites another record's file.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::AppResult;

#[derive(Clone)]
pub struct CoverStorage {
    image_dir: PathBuf,
}

impl CoverStorage {
    pub fn new<P: Into<PathBuf>>(image_dir: P) -> Self {
        Self {
            image_dir: image_dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.image_dir
    }

    /// Create the storage directory if it does not exist yet
    pub async fn ensure_dir(&self) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.image_dir).await?;
        Ok(())
    }

    /// Persist uploaded bytes under a fresh UUID name, returning the stored
    /// file name
    pub async fn save(&self, data: &[u8], extension: &str) -> AppResult<String> {
        let file_name = format!("{}.{}", Uuid::new_v4(), extension);
        let path = self.image_dir.join(&file_name);
        tokio::fs::write(&path, data).await?;
        debug!("Stored cover image {} ({} bytes)", file_name, data.len());
        Ok(file_name)
    }

    /// Remove a stored cover. A missing file is not an error; the record is
    /// the source of truth and the file may already be gone.
    pub async fn delete(&self, file_name: &str) -> AppResult<()> {
        let path = self.image_dir.join(file_name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed cover image {}", file_name);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Cover image {} was already missing", file_name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_and_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = CoverStorage::new(dir.path());
        storage.ensure_dir().await.unwrap();

        let name = storage.save(b"png bytes", "png").await.unwrap();
        assert!(name.ends_with(".png"));
        let stored = tokio::fs::read(dir.path().join(&name)).await.unwrap();
        assert_eq!(stored, b"png bytes");

        storage.delete(&name).await.unwrap();
        assert!(!dir.path().join(&name).exists());
    }

    #[tokio::test]
    async fn test_saves_never_collide() {
        let dir = tempfile::tempdir().unwrap();
        let storage = CoverStorage::new(dir.path());
        storage.ensure_dir().await.unwrap();

        let a = storage.save(b"a", "jpg").await.unwrap();
        let b = storage.save(b"b", "jpg").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_delete_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = CoverStorage::new(dir.path());
        storage.ensure_dir().await.unwrap();

        assert!(storage.delete("not-there.png").await.is_ok());
    }

    #[tokio::test]
    async fn test_ensure_dir_creates_nested_path() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let storage = CoverStorage::new(&nested);
        storage.ensure_dir().await.unwrap();
        assert!(nested.is_dir());
    }
}
