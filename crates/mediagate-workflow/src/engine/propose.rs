use mediagate_core::{AppError, Identity, Record, RecordState};
use mediagate_db::RecordChange;
use mediagate_storage::keys::{backup_key, staging_key};
use mediagate_storage::UploadReader;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::EngineInner;
use crate::gate::GatePermit;
use crate::outcome::{Outcome, PolicyViolation};
use crate::undo::{UndoLog, UndoStep};

impl EngineInner {
    pub(super) async fn add(
        &self,
        _permit: &GatePermit,
        name: String,
        reader: UploadReader,
        actor: &Identity,
        cancel: &CancellationToken,
    ) -> Result<Outcome, AppError> {
        if self.path_occupied(&name).await? {
            return Ok(PolicyViolation::PathOccupied(name).into());
        }

        let mut undo = UndoLog::new();
        let result = async {
            let attributes = self.store_content(&mut undo, &name, reader, cancel).await?;
            let record = Record::new(name.clone(), attributes, actor);
            self.records
                .commit(vec![RecordChange::Insert(record.clone())])
                .await?;
            Ok::<_, AppError>(record)
        }
        .await;

        match result {
            Ok(record) => {
                tracing::info!(
                    record_id = %record.id,
                    path = %record.path,
                    state = ?record.state.kind(),
                    "File added"
                );
                Ok(self.committed())
            }
            Err(e) => Err(self.roll_back(undo, e).await),
        }
    }

    pub(super) async fn replace(
        &self,
        permit: &GatePermit,
        name: String,
        reader: UploadReader,
        actor: &Identity,
        cancel: &CancellationToken,
    ) -> Result<Outcome, AppError> {
        let existing = match self.records.find_by_path(&name).await? {
            Some(existing) => existing,
            None => return self.add(permit, name, reader, actor, cancel).await,
        };

        if !existing.state.is_stable() {
            return Ok(PolicyViolation::PendingChange(name).into());
        }

        let staging = staging_key(&name);
        if self.path_occupied(&staging).await? {
            return Ok(PolicyViolation::PathOccupied(staging).into());
        }

        if actor.is_privileged() {
            self.swap_in_place(existing, staging, reader, actor, cancel)
                .await
        } else {
            self.propose_replacement(existing, staging, reader, actor, cancel)
                .await
        }
    }

    /// Privileged replace: new content takes the original path at once.
    async fn swap_in_place(
        &self,
        existing: Record,
        staging: String,
        reader: UploadReader,
        actor: &Identity,
        cancel: &CancellationToken,
    ) -> Result<Outcome, AppError> {
        let backup = backup_key(&existing.path);
        if self.files.exists(&backup).await? {
            return Ok(PolicyViolation::PathOccupied(backup).into());
        }

        let mut undo = UndoLog::new();
        let result = async {
            let attributes = self
                .store_content(&mut undo, &staging, reader, cancel)
                .await?;

            self.files
                .replace_with_backup(&staging, &existing.path, &backup)
                .await?;
            undo.push(UndoStep::UnSwap {
                target: existing.path.clone(),
                staging: staging.clone(),
                backup: backup.clone(),
            });

            // A fresh row (and id) for the new content; the path stays unique
            // because the old row goes first.
            let record = Record::new(existing.path.clone(), attributes, actor);
            self.records
                .commit(vec![
                    RecordChange::Delete(existing.id),
                    RecordChange::Insert(record.clone()),
                ])
                .await?;
            Ok::<_, AppError>(record)
        }
        .await;

        match result {
            Ok(record) => {
                self.discard_backup(&backup).await;
                tracing::info!(
                    record_id = %record.id,
                    previous_id = %existing.id,
                    path = %record.path,
                    "File replaced"
                );
                Ok(self.committed())
            }
            Err(e) => Err(self.roll_back(undo, e).await),
        }
    }

    /// Standard replace: stage the new content and link it to the original.
    async fn propose_replacement(
        &self,
        mut existing: Record,
        staging: String,
        reader: UploadReader,
        actor: &Identity,
        cancel: &CancellationToken,
    ) -> Result<Outcome, AppError> {
        let mut undo = UndoLog::new();
        let result = async {
            let attributes = self
                .store_content(&mut undo, &staging, reader, cancel)
                .await?;

            let mut replacement = Record::new(staging.clone(), attributes, actor);
            replacement.state = RecordState::Replacing;
            existing.state = RecordState::BeingReplaced {
                by: actor.id,
                on: replacement.id,
            };

            self.records
                .commit(vec![
                    RecordChange::Insert(replacement.clone()),
                    RecordChange::Update(existing.clone()),
                ])
                .await?;
            Ok::<_, AppError>(replacement)
        }
        .await;

        match result {
            Ok(replacement) => {
                tracing::info!(
                    record_id = %existing.id,
                    replacement_id = %replacement.id,
                    staging = %replacement.path,
                    "Replacement proposed"
                );
                Ok(self.committed())
            }
            Err(e) => Err(self.roll_back(undo, e).await),
        }
    }

    pub(super) async fn delete(
        &self,
        _permit: &GatePermit,
        record_id: Uuid,
        actor: &Identity,
    ) -> Result<Outcome, AppError> {
        let mut record = match self.records.get(record_id).await? {
            Some(record) => record,
            None => return Ok(PolicyViolation::RecordGone.into()),
        };

        if !record.state.is_stable() {
            return Ok(PolicyViolation::NotStable(record.path).into());
        }

        if actor.is_privileged() {
            return self.remove_with_record(record, Vec::new()).await;
        }

        record.state = RecordState::Deleting { by: actor.id };
        self.records
            .commit(vec![RecordChange::Update(record.clone())])
            .await?;

        tracing::info!(record_id = %record.id, path = %record.path, "Deletion proposed");
        Ok(self.committed())
    }

    /// Remove a record's file and row together.
    ///
    /// The file is moved to its backup key first and only deleted after the
    /// row deletion (plus any `extra` changes, applied before it) commits.
    pub(super) async fn remove_with_record(
        &self,
        record: Record,
        extra: Vec<RecordChange>,
    ) -> Result<Outcome, AppError> {
        let backup = backup_key(&record.path);
        if self.files.exists(&backup).await? {
            return Ok(PolicyViolation::PathOccupied(backup).into());
        }

        let mut undo = UndoLog::new();
        let result = async {
            self.files.rename(&record.path, &backup).await?;
            undo.push(UndoStep::RenameBack {
                from: backup.clone(),
                to: record.path.clone(),
            });

            let mut changes = extra;
            changes.push(RecordChange::Delete(record.id));
            self.records.commit(changes).await?;
            Ok::<_, AppError>(())
        }
        .await;

        match result {
            Ok(()) => {
                self.discard_backup(&backup).await;
                tracing::info!(record_id = %record.id, path = %record.path, "File removed");
                Ok(self.committed())
            }
            Err(e) => Err(self.roll_back(undo, e).await),
        }
    }
}
