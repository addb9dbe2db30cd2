//! File-store abstraction trait
//!
//! Every primitive the workflow engine needs to stage, swap and remove large
//! files without ever leaving a key with neither its old nor its new content.

use async_trait::async_trait;
use mediagate_core::AppError;
use std::path::PathBuf;
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

/// Uploaded byte stream handed to [`FileStore::write_new`].
pub type UploadReader = Pin<Box<dyn AsyncRead + Send + Unpin>>;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Rename failed: {0}")]
    RenameFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("File already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Upload exceeds the limit of {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("Upload cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::TooLarge { limit } => AppError::PayloadTooLarge(format!(
                "The file exceeds the maximum allowed size of {} bytes",
                limit
            )),
            StorageError::Cancelled => AppError::Cancelled,
            StorageError::InvalidKey(key) => AppError::InvalidInput(format!(
                "\"{}\" is not a valid file name",
                key
            )),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// File-store abstraction trait
///
/// Keys are plain file names inside one flat directory. None of the mutating
/// primitives overwrite an existing key except [`FileStore::replace_with_backup`],
/// which keeps the previous content under the backup key.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Write a stream to a key that must not exist yet.
    ///
    /// Fails with `TooLarge` once more than `limit` bytes were read and with
    /// `Cancelled` when `cancel` fires mid-copy. A failed write leaves no file
    /// behind. Returns the number of bytes written.
    async fn write_new(
        &self,
        key: &str,
        reader: UploadReader,
        limit: u64,
        cancel: &CancellationToken,
    ) -> StorageResult<u64>;

    /// Check if a key exists
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Move `from` to `to`; `to` must not exist.
    async fn rename(&self, from: &str, to: &str) -> StorageResult<()>;

    /// Put the content of `source` at `target`, keeping the previous content of
    /// `target` at `backup`.
    ///
    /// `target` holds either its old or its new content at every instant.
    /// On failure nothing has moved.
    async fn replace_with_backup(
        &self,
        source: &str,
        target: &str,
        backup: &str,
    ) -> StorageResult<()>;

    /// Delete a key. Deleting a missing key is not an error.
    async fn remove(&self, key: &str) -> StorageResult<()>;

    /// All keys currently present, sorted.
    async fn list_keys(&self) -> StorageResult<Vec<String>>;

    /// Filesystem location of a key, for collaborators that read files by path.
    fn local_path(&self, key: &str) -> StorageResult<PathBuf>;
}
