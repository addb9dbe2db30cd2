use mediagate_storage::{FileStore, StorageResult};

/// Compensation for one completed file-store step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoStep {
    /// Drop content written to a fresh key.
    Remove { key: String },
    /// Move a file renamed away (usually to its backup key) back.
    RenameBack { from: String, to: String },
    /// Reverse `replace_with_backup`: move the new content at `target` back to
    /// `staging`, then restore `backup` to `target`.
    UnSwap {
        target: String,
        staging: String,
        backup: String,
    },
}

impl UndoStep {
    /// Run the compensation. Every step checks the current layout first, so
    /// running it again after a partial or full undo changes nothing.
    async fn run(&self, files: &dyn FileStore) -> StorageResult<()> {
        match self {
            UndoStep::Remove { key } => files.remove(key).await,
            UndoStep::RenameBack { from, to } => {
                if files.exists(from).await? && !files.exists(to).await? {
                    files.rename(from, to).await?;
                }
                Ok(())
            }
            UndoStep::UnSwap {
                target,
                staging,
                backup,
            } => {
                if !files.exists(backup).await? {
                    return Ok(());
                }
                if files.exists(target).await? && !files.exists(staging).await? {
                    files.rename(target, staging).await?;
                }
                if !files.exists(target).await? {
                    files.rename(backup, target).await?;
                }
                Ok(())
            }
        }
    }
}

/// Compensations recorded after each forward step, unwound newest first.
#[derive(Debug, Clone, Default)]
pub struct UndoLog {
    steps: Vec<UndoStep>,
}

impl UndoLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: UndoStep) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Undo every recorded step in reverse order.
    ///
    /// A failing step is logged and the remaining steps still run; the
    /// number of failed steps is returned.
    pub async fn unwind(&self, files: &dyn FileStore) -> usize {
        let mut failed = 0;
        for step in self.steps.iter().rev() {
            tracing::warn!(step = ?step, "Rolling back file change");
            if let Err(e) = step.run(files).await {
                failed += 1;
                tracing::error!(error = %e, step = ?step, "Rollback step failed");
            }
        }
        failed
    }
}
