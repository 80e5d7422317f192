//! File storage for uploads and generated documents.
//!
//! Records in the database reference files by an opaque storage key. One
//! key may be shared by several records (a procedure file and its document,
//! or the contract scan of sibling engagements), so callers delete a file
//! only after checking that nothing references its key any more.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("stored file not found: {0}")]
    NotFound(String),

    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::InternalError(format!("Storage error: {err}"))
    }
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Store `bytes` under a fresh key derived from `original_name`'s
    /// extension and return the key.
    async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<String, StorageError>;

    async fn read(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Removing a missing file is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    async fn exists(&self, key: &str) -> Result<bool, StorageError>;
}

/// Files under a root directory, sharded by year and month.
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

fn new_key(original_name: &str) -> String {
    let ext = auditdesk_core::uploads::file_extension(original_name)
        .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    format!("{}/{}{ext}", Utc::now().format("%Y/%m"), Uuid::now_v7())
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let key = new_key(original_name);
        let path = self.path_for(&key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(key = %key, size = bytes.len(), "Stored file");
        Ok(key)
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(key = %key, "Deleted stored file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.path_for(key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn save_read_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());

        let key = storage.save("Договір.PDF", b"scan").await.unwrap();
        assert!(key.ends_with(".pdf"));
        assert_eq!(storage.read(&key).await.unwrap(), b"scan");
        assert!(storage.exists(&key).await.unwrap());

        storage.delete(&key).await.unwrap();
        assert!(!storage.exists(&key).await.unwrap());
        assert_matches!(storage.read(&key).await, Err(StorageError::NotFound(_)));
        storage.delete(&key).await.unwrap();
    }

    #[tokio::test]
    async fn keys_cannot_escape_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());
        assert_matches!(
            storage.read("../etc/passwd").await,
            Err(StorageError::InvalidKey(_))
        );
        assert_matches!(storage.read("/etc/passwd").await, Err(StorageError::InvalidKey(_)));
    }

    #[test]
    fn key_drops_odd_extensions() {
        assert!(!new_key("report.tar gz").contains(' '));
        assert!(!new_key("noext").contains('.'));
    }
}
