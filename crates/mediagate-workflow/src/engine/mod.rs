//! Workflow engine
//!
//! Public operations validate what they can without touching either store,
//! then wait for the [`Gate`] and run their critical section in a spawned
//! task that owns the permit. Dropping the caller's future therefore never
//! interrupts a half-done change; it still runs to commit or rollback before
//! the next operation starts.

mod propose;
mod resolve;

use mediagate_core::constants::{
    BACKUP_PREFIX, DEFAULT_PUBLIC_PREFIX, MAX_FILE_NAME_BYTES, MAX_UPLOAD_BYTES, STAGING_PREFIX,
};
use mediagate_core::{public_path, AppError, Identity, MediaAttributes, Record};
use mediagate_db::RecordStore;
use mediagate_processing::MetadataExtractor;
use mediagate_storage::keys::reserved_prefix;
use mediagate_storage::{FileStore, UploadReader};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::gate::{Gate, GatePermit};
use crate::notify::{ChangeNotice, ChangeNotifier};
use crate::outcome::{Outcome, PolicyViolation};
use crate::undo::{UndoLog, UndoStep};
use crate::upload::Upload;

/// Serialized media file workflow over a file store and a record store.
///
/// Cheap to clone; clones share the same gate and notification channel.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

/// Tunables fixed at construction.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Directory name used by [`Engine::public_path`].
    pub public_prefix: String,
    /// Upper bound for a single upload, in bytes.
    pub upload_limit: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            public_prefix: DEFAULT_PUBLIC_PREFIX.to_string(),
            upload_limit: MAX_UPLOAD_BYTES,
        }
    }
}

struct EngineInner {
    files: Arc<dyn FileStore>,
    records: Arc<dyn RecordStore>,
    extractor: Arc<dyn MetadataExtractor>,
    gate: Gate,
    notifier: ChangeNotifier,
    settings: EngineSettings,
}

/// Refusal for a name that cannot become a stored file's key.
///
/// The longest transient key derived from a name is its staged copy's backup,
/// `backup.replace.{name}`, and that key must still fit the filesystem.
fn check_upload_name(name: &str) -> Option<PolicyViolation> {
    if name.is_empty() || name == "." || name == ".." || name.chars().any(char::is_control) {
        return Some(PolicyViolation::InvalidName(name.to_string()));
    }

    if name.len() + BACKUP_PREFIX.len() + STAGING_PREFIX.len() > MAX_FILE_NAME_BYTES {
        return Some(PolicyViolation::InvalidName(name.to_string()));
    }

    reserved_prefix(name).map(PolicyViolation::ReservedPrefix)
}

impl Engine {
    pub fn new(
        files: Arc<dyn FileStore>,
        records: Arc<dyn RecordStore>,
        extractor: Arc<dyn MetadataExtractor>,
    ) -> Self {
        Self::with_settings(files, records, extractor, EngineSettings::default())
    }

    pub fn with_settings(
        files: Arc<dyn FileStore>,
        records: Arc<dyn RecordStore>,
        extractor: Arc<dyn MetadataExtractor>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                files,
                records,
                extractor,
                gate: Gate::new(),
                notifier: ChangeNotifier::new(),
                settings,
            }),
        }
    }

    /// Receiver of a notice after every committed change.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotice> {
        self.inner.notifier.subscribe()
    }

    /// Public URL path of a stored file.
    pub fn public_path(&self, key: &str) -> String {
        public_path(&self.inner.settings.public_prefix, key)
    }

    pub fn gate(&self) -> &Gate {
        &self.inner.gate
    }

    /// Store new content and create its record.
    ///
    /// Privileged actors create a Stable record; Standard actors create one
    /// waiting for approval.
    #[tracing::instrument(skip_all, fields(op = "add", file = %upload.name(), actor = %actor.name))]
    pub async fn add(
        &self,
        upload: Upload,
        actor: &Identity,
        cancel: &CancellationToken,
    ) -> Result<Outcome, AppError> {
        if let Some(violation) = check_upload_name(upload.name()) {
            return Ok(violation.into());
        }

        let (name, reader) = upload.into_parts();
        let actor = actor.clone();
        let token = cancel.clone();
        self.serialized(cancel, move |inner, permit| async move {
            inner.add(&permit, name, reader, &actor, &token).await
        })
        .await
    }

    /// Replace the content of an existing Stable record, or add the file
    /// when no record uses its name yet.
    #[tracing::instrument(skip_all, fields(op = "replace", file = %upload.name(), actor = %actor.name))]
    pub async fn replace(
        &self,
        upload: Upload,
        actor: &Identity,
        cancel: &CancellationToken,
    ) -> Result<Outcome, AppError> {
        if let Some(violation) = check_upload_name(upload.name()) {
            return Ok(violation.into());
        }

        let (name, reader) = upload.into_parts();
        let actor = actor.clone();
        let token = cancel.clone();
        self.serialized(cancel, move |inner, permit| async move {
            inner.replace(&permit, name, reader, &actor, &token).await
        })
        .await
    }

    /// Delete a Stable record and its file, or propose the deletion.
    #[tracing::instrument(skip_all, fields(op = "delete", record_id = %record_id, actor = %actor.name))]
    pub async fn delete(
        &self,
        record_id: Uuid,
        actor: &Identity,
        cancel: &CancellationToken,
    ) -> Result<Outcome, AppError> {
        let actor = actor.clone();
        self.serialized(cancel, move |inner, permit| async move {
            inner.delete(&permit, record_id, &actor).await
        })
        .await
    }

    /// Approve the pending change of a record.
    #[tracing::instrument(skip_all, fields(op = "apply", record_id = %record_id, actor = %actor.name))]
    pub async fn apply(
        &self,
        record_id: Uuid,
        actor: &Identity,
        cancel: &CancellationToken,
    ) -> Result<Outcome, AppError> {
        if !actor.is_privileged() {
            return Ok(PolicyViolation::NotPrivileged.into());
        }

        self.serialized(cancel, move |inner, permit| async move {
            inner.apply(&permit, record_id).await
        })
        .await
    }

    /// Discard the pending change of a record.
    #[tracing::instrument(skip_all, fields(op = "reject", record_id = %record_id, actor = %actor.name))]
    pub async fn reject(
        &self,
        record_id: Uuid,
        actor: &Identity,
        cancel: &CancellationToken,
    ) -> Result<Outcome, AppError> {
        if !actor.is_privileged() {
            return Ok(PolicyViolation::NotPrivileged.into());
        }

        self.serialized(cancel, move |inner, permit| async move {
            inner.reject(&permit, record_id).await
        })
        .await
    }

    /// Current records, newest first, read under the gate.
    pub async fn list(&self, cancel: &CancellationToken) -> Result<Vec<Record>, AppError> {
        self.serialized(cancel, |inner, permit| async move {
            let records = inner.records.list().await;
            drop(permit);
            records
        })
        .await
    }

    /// Enter the gate, then run `op` to completion in its own task.
    async fn serialized<T, F, Fut>(&self, cancel: &CancellationToken, op: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(Arc<EngineInner>, GatePermit) -> Fut,
        Fut: Future<Output = Result<T, AppError>> + Send + 'static,
    {
        let permit = self.inner.gate.enter(cancel).await?;
        let task = tokio::spawn(
            op(Arc::clone(&self.inner), permit).instrument(tracing::Span::current()),
        );

        task.await.map_err(|e| {
            tracing::error!(error = %e, "Critical section task failed");
            AppError::Internal(format!("Critical section task failed: {}", e))
        })?
    }
}

impl EngineInner {
    /// Whether a file or a record already uses `key`.
    async fn path_occupied(&self, key: &str) -> Result<bool, AppError> {
        Ok(self.files.exists(key).await? || self.records.find_by_path(key).await?.is_some())
    }

    /// Write an upload to a fresh key and read its attributes.
    async fn store_content(
        &self,
        undo: &mut UndoLog,
        key: &str,
        reader: UploadReader,
        cancel: &CancellationToken,
    ) -> Result<MediaAttributes, AppError> {
        let size = self
            .files
            .write_new(key, reader, self.settings.upload_limit, cancel)
            .await?;
        undo.push(UndoStep::Remove {
            key: key.to_string(),
        });
        tracing::debug!(key = %key, size_bytes = size, "Upload stored");

        let path = self.files.local_path(key)?;
        self.extractor.extract(&path).await
    }

    /// Compensate the file steps of a failed change and hand back its fault.
    async fn roll_back(&self, undo: UndoLog, err: AppError) -> AppError {
        tracing::warn!(error = %err, steps = undo.len(), "Change failed, rolling back");
        let failed = undo.unwind(self.files.as_ref()).await;
        if failed > 0 {
            tracing::error!(failed, "Rollback incomplete, manual cleanup required");
        }
        err
    }

    /// Drop a backup once the record change is committed.
    async fn discard_backup(&self, backup: &str) {
        if let Err(e) = self.files.remove(backup).await {
            tracing::warn!(error = %e, backup = %backup, "Failed to delete backup after commit");
        }
    }

    fn committed(&self) -> Outcome {
        self.notifier.notify();
        Outcome::Done
    }
}
