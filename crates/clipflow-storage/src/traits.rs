use std::path::Path;

use async_trait::async_trait;

use clipflow_core::AppError;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("upload failed: {0}")]
    UploadFailed(String),

    #[error("delete failed: {0}")]
    DeleteFailed(String),

    #[error("storage configuration error: {0}")]
    ConfigError(String),

    #[error("storage backend error: {0}")]
    BackendError(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Storage(err.to_string())
    }
}

/// Object storage operations used by the transcode pipeline.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Download an object to a local file, returning its size in bytes.
    async fn download_to_file(&self, key: &str, dest: &Path) -> StorageResult<u64>;

    /// Upload a local file, overwriting any existing object at `key`.
    async fn upload_file(&self, key: &str, path: &Path, content_type: &str) -> StorageResult<()>;

    /// Delete an object. Deleting an absent object is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    async fn exists(&self, key: &str) -> StorageResult<bool>;
}
