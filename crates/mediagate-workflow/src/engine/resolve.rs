use mediagate_core::{AppError, Record, RecordState};
use mediagate_db::RecordChange;
use mediagate_storage::keys::backup_key;
use uuid::Uuid;

use super::EngineInner;
use crate::gate::GatePermit;
use crate::outcome::{Outcome, PolicyViolation};
use crate::undo::{UndoLog, UndoStep};

impl EngineInner {
    /// Resolve both halves of a pending replacement from either side.
    async fn replacement_pair(
        &self,
        _permit: &GatePermit,
        record: Record,
    ) -> Result<(Record, Record), AppError> {
        match record.state {
            RecordState::Replacing => {
                let original = self.records.find_replaced_by(record.id).await?.ok_or_else(|| {
                    AppError::Inconsistent(format!(
                        "record {} is Replacing but nothing is being replaced by it",
                        record.id
                    ))
                })?;
                Ok((original, record))
            }
            RecordState::BeingReplaced { on, .. } => {
                let replacement = self
                    .records
                    .get(on)
                    .await?
                    .filter(|r| r.state == RecordState::Replacing)
                    .ok_or_else(|| {
                        AppError::Inconsistent(format!(
                            "record {} is BeingReplaced on {} which is not a Replacing record",
                            record.id, on
                        ))
                    })?;
                Ok((record, replacement))
            }
            other => Err(AppError::Inconsistent(format!(
                "record {} in state {:?} has no pending replacement",
                record.id,
                other.kind()
            ))),
        }
    }

    pub(super) async fn apply(&self, permit: &GatePermit, record_id: Uuid) -> Result<Outcome, AppError> {
        let mut record = match self.records.get(record_id).await? {
            Some(record) => record,
            None => return Ok(PolicyViolation::RecordGone.into()),
        };

        match record.state {
            RecordState::Stable => Ok(Outcome::Done),
            RecordState::Adding => {
                record.state = RecordState::Stable;
                self.records
                    .commit(vec![RecordChange::Update(record.clone())])
                    .await?;
                tracing::info!(record_id = %record.id, path = %record.path, "Addition applied");
                Ok(self.committed())
            }
            RecordState::Replacing | RecordState::BeingReplaced { .. } => {
                let (original, replacement) = self.replacement_pair(permit, record).await?;
                self.apply_replacement(permit, original, replacement).await
            }
            RecordState::Deleting { .. } => self.remove_with_record(record, Vec::new()).await,
        }
    }

    /// Swap the staged content over the original path; the replacement row
    /// takes over that path and the original row goes away.
    async fn apply_replacement(
        &self,
        _permit: &GatePermit,
        original: Record,
        mut replacement: Record,
    ) -> Result<Outcome, AppError> {
        let backup = backup_key(&original.path);
        if self.files.exists(&backup).await? {
            return Ok(PolicyViolation::PathOccupied(backup).into());
        }

        let staging = replacement.path.clone();
        let mut undo = UndoLog::new();
        let result = async {
            self.files
                .replace_with_backup(&staging, &original.path, &backup)
                .await?;
            undo.push(UndoStep::UnSwap {
                target: original.path.clone(),
                staging: staging.clone(),
                backup: backup.clone(),
            });

            replacement.path = original.path.clone();
            replacement.state = RecordState::Stable;
            self.records
                .commit(vec![
                    RecordChange::Delete(original.id),
                    RecordChange::Update(replacement.clone()),
                ])
                .await?;
            Ok::<_, AppError>(())
        }
        .await;

        match result {
            Ok(()) => {
                self.discard_backup(&backup).await;
                tracing::info!(
                    record_id = %replacement.id,
                    previous_id = %original.id,
                    path = %replacement.path,
                    "Replacement applied"
                );
                Ok(self.committed())
            }
            Err(e) => Err(self.roll_back(undo, e).await),
        }
    }

    pub(super) async fn reject(&self, permit: &GatePermit, record_id: Uuid) -> Result<Outcome, AppError> {
        let mut record = match self.records.get(record_id).await? {
            Some(record) => record,
            None => return Ok(PolicyViolation::RecordGone.into()),
        };

        match record.state {
            RecordState::Stable => Ok(Outcome::Done),
            RecordState::Adding => self.remove_with_record(record, Vec::new()).await,
            RecordState::Replacing | RecordState::BeingReplaced { .. } => {
                let (mut original, replacement) = self.replacement_pair(permit, record).await?;
                original.state = RecordState::Stable;
                self.remove_with_record(replacement, vec![RecordChange::Update(original)])
                    .await
            }
            RecordState::Deleting { .. } => {
                record.state = RecordState::Stable;
                self.records
                    .commit(vec![RecordChange::Update(record.clone())])
                    .await?;
                tracing::info!(record_id = %record.id, path = %record.path, "Deletion rejected");
                Ok(self.committed())
            }
        }
    }
}
