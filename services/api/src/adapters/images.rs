//! services/api/src/adapters/images.rs
//!
//! An `ImageStore` backed by a local directory that the api binary serves as
//! static files.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bookstore_core::ports::{ImageStore, PortError, PortResult};
use tracing::info;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct LocalImageStore {
    root: PathBuf,
    base_url: String,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn upload(&self, path: &Path, folder: &str) -> PortResult<String> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_default();
        let file_name = format!("{}{}", Uuid::new_v4(), extension);

        let dir = self.root.join(folder);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let target = dir.join(&file_name);

        // A rename fails across filesystems; fall back to copy and remove.
        if tokio::fs::rename(path, &target).await.is_err() {
            tokio::fs::copy(path, &target)
                .await
                .map_err(|e| PortError::Unexpected(format!("Failed to store image: {}", e)))?;
            let _ = tokio::fs::remove_file(path).await;
        }

        info!("Stored image {}", target.display());
        Ok(format!("{}/{}/{}", self.base_url, folder, file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_moves_the_file_and_returns_its_url() {
        let staging = tempfile::tempdir().unwrap();
        let media = tempfile::tempdir().unwrap();
        let source = staging.path().join("cover.PNG");
        tokio::fs::write(&source, b"png-bytes").await.unwrap();

        let store = LocalImageStore::new(media.path(), "/media");
        let url = store.upload(&source, "books").await.unwrap();

        assert!(url.starts_with("/media/books/"));
        assert!(url.ends_with(".png"));
        assert!(!source.exists());
        let stored_name = url.rsplit('/').next().unwrap();
        let stored = media.path().join("books").join(stored_name);
        assert_eq!(tokio::fs::read(stored).await.unwrap(), b"png-bytes");
    }

    #[tokio::test]
    async fn missing_source_is_an_error() {
        let media = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(media.path(), "/media");
        let result = store
            .upload(&media.path().join("absent.jpg"), "books")
            .await;
        assert!(matches!(result, Err(PortError::Unexpected(_))));
    }
}
