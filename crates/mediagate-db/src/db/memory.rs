use async_trait::async_trait;
use mediagate_core::constants::{BACKUP_PREFIX, STAGING_PREFIX};
use mediagate_core::{AppError, Identity, Record};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{RecordChange, RecordStore};

#[derive(Debug, Clone, Default)]
struct Tables {
    records: HashMap<Uuid, Record>,
    identities: HashMap<Uuid, Identity>,
}

impl Tables {
    fn apply(&mut self, change: &RecordChange) -> Result<(), AppError> {
        match change {
            RecordChange::Insert(record) => {
                if self.records.contains_key(&record.id) {
                    return Err(AppError::Constraint(format!(
                        "record {} already exists",
                        record.id
                    )));
                }
                self.records.insert(record.id, record.clone());
            }
            RecordChange::Update(record) => match self.records.get_mut(&record.id) {
                // Identity and attributes are fixed at creation
                Some(existing) => {
                    existing.path = record.path.clone();
                    existing.state = record.state;
                }
                None => {
                    return Err(AppError::Constraint(format!(
                        "record {} does not exist",
                        record.id
                    )))
                }
            },
            RecordChange::Delete(id) => {
                if self.records.remove(id).is_none() {
                    return Err(AppError::Constraint(format!("record {} does not exist", id)));
                }
            }
        }
        self.check()
    }

    /// Same rules as the `media_files` table constraints.
    fn check(&self) -> Result<(), AppError> {
        let mut paths: HashMap<&str, Uuid> = HashMap::new();
        let mut successors: HashMap<Uuid, Uuid> = HashMap::new();

        for record in self.records.values() {
            if let Some(other) = paths.insert(record.path.as_str(), record.id) {
                return Err(AppError::Constraint(format!(
                    "path {} is used by records {} and {}",
                    record.path, other, record.id
                )));
            }

            if record.path.starts_with(BACKUP_PREFIX)
                || (record.state.is_stable() && record.path.starts_with(STAGING_PREFIX))
            {
                return Err(AppError::Constraint(format!(
                    "record {} cannot use reserved path {}",
                    record.id, record.path
                )));
            }

            let identities = std::iter::once(record.added_by)
                .chain(record.state.being_replaced_by())
                .chain(record.state.deleting_by());
            for identity in identities {
                if !self.identities.contains_key(&identity) {
                    return Err(AppError::Constraint(format!(
                        "record {} references unknown identity {}",
                        record.id, identity
                    )));
                }
            }

            if let Some(on) = record.state.being_replaced_on() {
                if !self.records.contains_key(&on) {
                    return Err(AppError::Constraint(format!(
                        "record {} references missing replacement {}",
                        record.id, on
                    )));
                }
                if let Some(other) = successors.insert(on, record.id) {
                    return Err(AppError::Constraint(format!(
                        "records {} and {} share replacement {}",
                        other, record.id, on
                    )));
                }
            }
        }

        Ok(())
    }
}

/// In-memory record store
///
/// Commits are staged on a copy of the tables, checked after every change and
/// swapped in only when all changes pass, so a failed commit leaves nothing
/// behind.
#[derive(Default)]
pub struct MemoryRecordStore {
    tables: RwLock<Tables>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, id: Uuid) -> Result<Option<Record>, AppError> {
        Ok(self.tables.read().await.records.get(&id).cloned())
    }

    async fn find_by_path(&self, path: &str) -> Result<Option<Record>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.records.values().find(|r| r.path == path).cloned())
    }

    async fn find_replaced_by(&self, replacement_id: Uuid) -> Result<Option<Record>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .records
            .values()
            .find(|r| r.state.being_replaced_on() == Some(replacement_id))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Record>, AppError> {
        let tables = self.tables.read().await;
        let mut records: Vec<Record> = tables.records.values().cloned().collect();
        records.sort_by(|a, b| b.added_at.cmp(&a.added_at).then(a.id.cmp(&b.id)));
        Ok(records)
    }

    async fn commit(&self, changes: Vec<RecordChange>) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        let mut staged = tables.clone();

        for change in &changes {
            staged.apply(change)?;
        }

        *tables = staged;
        tracing::debug!(changes = changes.len(), "Memory record store commit successful");
        Ok(())
    }

    async fn find_identity_by_name(&self, name: &str) -> Result<Option<Identity>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.identities.values().find(|i| i.name == name).cloned())
    }

    async fn create_identity(&self, identity: &Identity) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        if tables
            .identities
            .values()
            .any(|i| i.id == identity.id || i.name == identity.name)
        {
            return Err(AppError::Constraint(format!(
                "identity {} already exists",
                identity.name
            )));
        }
        tables.identities.insert(identity.id, identity.clone());
        Ok(())
    }
}
