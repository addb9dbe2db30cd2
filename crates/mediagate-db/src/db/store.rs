use async_trait::async_trait;
use mediagate_core::{AppError, Identity, Record};
use uuid::Uuid;

/// One row-level change inside an atomic commit.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordChange {
    Insert(Record),
    Update(Record),
    Delete(Uuid),
}

impl RecordChange {
    pub fn record_id(&self) -> Uuid {
        match self {
            RecordChange::Insert(record) | RecordChange::Update(record) => record.id,
            RecordChange::Delete(id) => *id,
        }
    }
}

/// Persistence seam for media file records and identities.
///
/// `commit` applies its changes in order and all-or-nothing: either every
/// change becomes visible or none does. Implementations enforce unique paths,
/// existing link targets and the state/relation bijection at commit time and
/// report violations as [`AppError::Constraint`].
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Record>, AppError>;

    async fn find_by_path(&self, path: &str) -> Result<Option<Record>, AppError>;

    /// The BeingReplaced record whose successor is `replacement_id`.
    async fn find_replaced_by(&self, replacement_id: Uuid) -> Result<Option<Record>, AppError>;

    /// All records, newest first.
    async fn list(&self) -> Result<Vec<Record>, AppError>;

    async fn commit(&self, changes: Vec<RecordChange>) -> Result<(), AppError>;

    async fn find_identity_by_name(&self, name: &str) -> Result<Option<Identity>, AppError>;

    /// Register an identity; names are unique.
    async fn create_identity(&self, identity: &Identity) -> Result<(), AppError>;
}
