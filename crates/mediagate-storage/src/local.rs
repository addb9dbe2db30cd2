use crate::traits::{FileStore, StorageError, StorageResult, UploadReader};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Local filesystem file store over one flat directory
#[derive(Clone, Debug)]
pub struct LocalFileStore {
    base_path: PathBuf,
}

impl LocalFileStore {
    /// Create a new LocalFileStore instance
    ///
    /// # Arguments
    /// * `base_path` - Directory holding every stored file (e.g., "/srv/wwwroot/Videos")
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalFileStore { base_path })
    }

    /// Convert a key to a filesystem path inside the store directory.
    ///
    /// Keys are plain file names; anything that could name another directory
    /// is rejected.
    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty()
            || key == "."
            || key == ".."
            || key.contains('/')
            || key.contains('\\')
            || key.contains('\0')
        {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        Ok(self.base_path.join(key))
    }

    async fn path_exists(path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }

    async fn copy_bounded(
        file: &mut fs::File,
        mut reader: UploadReader,
        limit: u64,
        cancel: &CancellationToken,
    ) -> StorageResult<u64> {
        let mut buf = vec![0u8; COPY_BUFFER_SIZE];
        let mut written: u64 = 0;

        loop {
            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(StorageError::Cancelled),
                read = reader.read(&mut buf) => read?,
            };
            if read == 0 {
                break;
            }

            written += read as u64;
            if written > limit {
                return Err(StorageError::TooLarge { limit });
            }

            file.write_all(&buf[..read]).await?;
        }

        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn write_new(
        &self,
        key: &str,
        reader: UploadReader,
        limit: u64,
        cancel: &CancellationToken,
    ) -> StorageResult<u64> {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => StorageError::AlreadyExists(key.to_string()),
                _ => StorageError::UploadFailed(format!(
                    "Failed to create file {}: {}",
                    path.display(),
                    e
                )),
            })?;

        match Self::copy_bounded(&mut file, reader, limit, cancel).await {
            Ok(size) => {
                tracing::info!(
                    path = %path.display(),
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Local file store write successful"
                );
                Ok(size)
            }
            Err(e) => {
                drop(file);
                if let Err(remove_err) = fs::remove_file(&path).await {
                    tracing::error!(
                        error = %remove_err,
                        path = %path.display(),
                        "Failed to remove partially written file"
                    );
                }
                tracing::warn!(error = %e, key = %key, "Local file store write aborted");
                Err(e)
            }
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        Ok(Self::path_exists(&path).await)
    }

    async fn rename(&self, from: &str, to: &str) -> StorageResult<()> {
        let from_path = self.key_to_path(from)?;
        let to_path = self.key_to_path(to)?;

        if !Self::path_exists(&from_path).await {
            return Err(StorageError::NotFound(from.to_string()));
        }
        if Self::path_exists(&to_path).await {
            return Err(StorageError::AlreadyExists(to.to_string()));
        }

        fs::rename(&from_path, &to_path).await.map_err(|e| {
            StorageError::RenameFailed(format!(
                "Failed to rename {} to {}: {}",
                from_path.display(),
                to_path.display(),
                e
            ))
        })?;

        tracing::debug!(from = %from, to = %to, "Local file store rename successful");
        Ok(())
    }

    async fn replace_with_backup(
        &self,
        source: &str,
        target: &str,
        backup: &str,
    ) -> StorageResult<()> {
        let source_path = self.key_to_path(source)?;
        let target_path = self.key_to_path(target)?;
        let backup_path = self.key_to_path(backup)?;

        if !Self::path_exists(&source_path).await {
            return Err(StorageError::NotFound(source.to_string()));
        }
        if !Self::path_exists(&target_path).await {
            return Err(StorageError::NotFound(target.to_string()));
        }
        if Self::path_exists(&backup_path).await {
            return Err(StorageError::AlreadyExists(backup.to_string()));
        }

        // The backup shares the target's inode, so the target keeps its old
        // content until the rename below swaps the new content in.
        if let Err(e) = fs::hard_link(&target_path, &backup_path).await {
            tracing::warn!(
                error = %e,
                target = %target,
                "Hard link unavailable, copying backup instead"
            );
            if let Err(copy_err) = fs::copy(&target_path, &backup_path).await {
                if let Err(remove_err) = fs::remove_file(&backup_path).await {
                    tracing::error!(
                        error = %remove_err,
                        backup = %backup,
                        "Failed to drop partial backup copy"
                    );
                }
                return Err(StorageError::RenameFailed(format!(
                    "Failed to back up {}: {}",
                    target_path.display(),
                    copy_err
                )));
            }
        }

        if let Err(e) = fs::rename(&source_path, &target_path).await {
            if let Err(remove_err) = fs::remove_file(&backup_path).await {
                tracing::error!(
                    error = %remove_err,
                    backup = %backup,
                    "Failed to drop backup after aborted replace"
                );
            }
            return Err(StorageError::RenameFailed(format!(
                "Failed to move {} over {}: {}",
                source_path.display(),
                target_path.display(),
                e
            )));
        }

        tracing::info!(
            source = %source,
            target = %target,
            backup = %backup,
            "Local file store replace successful"
        );
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;

        if !Self::path_exists(&path).await {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::debug!(key = %key, "Local file store delete successful");
        Ok(())
    }

    async fn list_keys(&self) -> StorageResult<Vec<String>> {
        let mut entries = fs::read_dir(&self.base_path).await?;
        let mut keys = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                keys.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        keys.sort();
        Ok(keys)
    }

    fn local_path(&self, key: &str) -> StorageResult<PathBuf> {
        self.key_to_path(key)
    }
}
