//! The `BlobStore` external contract (SPEC_FULL.md §6) — byte I/O only, no
//! document-structure awareness. A local-filesystem implementation is
//! provided for the default deployment shape; production backends (S3, SMB)
//! are out of scope the way the UI/auth layer is.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob not found: {0}")]
    NotFound(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type BlobResult<T> = Result<T, BlobError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobInfo {
    pub name: String,
    pub size: u64,
    pub last_modified: i64,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn list_files(&self, dataset: &str) -> BlobResult<Vec<BlobInfo>>;
    async fn get_file(&self, dataset: &str, filename: &str) -> BlobResult<Vec<u8>>;
    async fn dataset_exists(&self, dataset: &str) -> BlobResult<bool>;
    async fn create_dataset(&self, dataset: &str) -> BlobResult<()>;
}

/// Stores each dataset as a subdirectory of `root`, one file per blob.
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn dataset_dir(&self, dataset: &str) -> PathBuf {
        self.root.join(dataset)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn list_files(&self, dataset: &str) -> BlobResult<Vec<BlobInfo>> {
        let dir = self.dataset_dir(dataset);
        let mut entries = Vec::new();
        let mut read_dir = match tokio::fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = read_dir.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);
            entries.push(BlobInfo {
                name: entry.file_name().to_string_lossy().to_string(),
                size: metadata.len(),
                last_modified: modified,
            });
        }
        Ok(entries)
    }

    async fn get_file(&self, dataset: &str, filename: &str) -> BlobResult<Vec<u8>> {
        let path = self.dataset_dir(dataset).join(filename);
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BlobError::NotFound(format!("{}/{}", dataset, filename))
            } else {
                BlobError::Io(e)
            }
        })
    }

    async fn dataset_exists(&self, dataset: &str) -> BlobResult<bool> {
        Ok(tokio::fs::try_exists(self.dataset_dir(dataset)).await?)
    }

    async fn create_dataset(&self, dataset: &str) -> BlobResult<()> {
        tokio::fs::create_dir_all(self.dataset_dir(dataset)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        store.create_dataset("invoices").await.unwrap();
        tokio::fs::write(dir.path().join("invoices/a.pdf"), b"%PDF-1.4")
            .await
            .unwrap();

        let bytes = store.get_file("invoices", "a.pdf").await.unwrap();
        assert_eq!(bytes, b"%PDF-1.4");

        let files = store.list_files("invoices").await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "a.pdf");
    }

    #[tokio::test]
    async fn missing_blob_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        let err = store.get_file("invoices", "missing.pdf").await.unwrap_err();
        assert!(matches!(err, BlobError::NotFound(_)));
    }

    #[tokio::test]
    async fn listing_an_absent_dataset_is_empty_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        assert_eq!(store.list_files("nope").await.unwrap().len(), 0);
        assert!(!store.dataset_exists("nope").await.unwrap());
    }
}
