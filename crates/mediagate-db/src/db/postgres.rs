use async_trait::async_trait;
use mediagate_core::{AppError, Identity, Record, RecordRow};
use sqlx::{PgConnection, PgPool, Postgres};
use uuid::Uuid;

use super::store::{RecordChange, RecordStore};
use super::transaction::TransactionGuard;

const RECORD_COLUMNS: &str = "id, path, state, added_by, being_replaced_by, being_replaced_on, \
                              deleting_by, attributes, added_at";

/// Map a failed write to a constraint fault when the database refused it.
fn map_write_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db)
            if db.is_unique_violation()
                || db.is_foreign_key_violation()
                || db.is_check_violation() =>
        {
            let constraint = db.constraint().unwrap_or("unknown");
            AppError::Constraint(format!("{} ({})", db.message(), constraint))
        }
        _ => AppError::Database(err),
    }
}

/// PostgreSQL record store
///
/// Every `commit` runs inside one transaction; the schema's check constraints
/// mirror the state/relation bijection of [`mediagate_core::RecordState`].
#[derive(Clone)]
pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_one_record(&self, sql: &str, bind: RecordKey<'_>) -> Result<Option<Record>, AppError> {
        let query = sqlx::query_as::<Postgres, RecordRow>(sql);
        let query = match bind {
            RecordKey::Id(id) => query.bind(id),
            RecordKey::Path(path) => query.bind(path.to_string()),
        };

        match query.fetch_optional(&self.pool).await? {
            Some(row) => Ok(Some(Record::try_from(row)?)),
            None => Ok(None),
        }
    }

    async fn apply_change(conn: &mut PgConnection, change: &RecordChange) -> Result<(), AppError> {
        let affected = match change {
            RecordChange::Insert(record) => {
                let row = RecordRow::from(record);
                sqlx::query(
                    r#"
                    INSERT INTO media_files (
                        id, path, state, added_by, being_replaced_by, being_replaced_on,
                        deleting_by, attributes, added_at
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                    "#,
                )
                .bind(row.id)
                .bind(&row.path)
                .bind(row.state)
                .bind(row.added_by)
                .bind(row.being_replaced_by)
                .bind(row.being_replaced_on)
                .bind(row.deleting_by)
                .bind(&row.attributes)
                .bind(row.added_at)
                .execute(&mut *conn)
                .await
                .map_err(map_write_error)?
                .rows_affected()
            }
            RecordChange::Update(record) => {
                let row = RecordRow::from(record);
                sqlx::query(
                    r#"
                    UPDATE media_files
                    SET path = $2, state = $3, being_replaced_by = $4,
                        being_replaced_on = $5, deleting_by = $6
                    WHERE id = $1
                    "#,
                )
                .bind(row.id)
                .bind(&row.path)
                .bind(row.state)
                .bind(row.being_replaced_by)
                .bind(row.being_replaced_on)
                .bind(row.deleting_by)
                .execute(&mut *conn)
                .await
                .map_err(map_write_error)?
                .rows_affected()
            }
            RecordChange::Delete(id) => sqlx::query("DELETE FROM media_files WHERE id = $1")
                .bind(id)
                .execute(&mut *conn)
                .await
                .map_err(map_write_error)?
                .rows_affected(),
        };

        if affected == 0 {
            return Err(AppError::Constraint(format!(
                "record {} does not exist",
                change.record_id()
            )));
        }
        Ok(())
    }
}

enum RecordKey<'a> {
    Id(Uuid),
    Path(&'a str),
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    #[tracing::instrument(skip(self), fields(db.table = "media_files", db.operation = "select", db.record_id = %id))]
    async fn get(&self, id: Uuid) -> Result<Option<Record>, AppError> {
        let sql = format!("SELECT {} FROM media_files WHERE id = $1", RECORD_COLUMNS);
        self.fetch_one_record(&sql, RecordKey::Id(id)).await
    }

    #[tracing::instrument(skip(self), fields(db.table = "media_files", db.operation = "select"))]
    async fn find_by_path(&self, path: &str) -> Result<Option<Record>, AppError> {
        let sql = format!("SELECT {} FROM media_files WHERE path = $1", RECORD_COLUMNS);
        self.fetch_one_record(&sql, RecordKey::Path(path)).await
    }

    #[tracing::instrument(skip(self), fields(db.table = "media_files", db.operation = "select"))]
    async fn find_replaced_by(&self, replacement_id: Uuid) -> Result<Option<Record>, AppError> {
        let sql = format!(
            "SELECT {} FROM media_files WHERE being_replaced_on = $1",
            RECORD_COLUMNS
        );
        self.fetch_one_record(&sql, RecordKey::Id(replacement_id)).await
    }

    #[tracing::instrument(skip(self), fields(db.table = "media_files", db.operation = "select"))]
    async fn list(&self) -> Result<Vec<Record>, AppError> {
        let sql = format!(
            "SELECT {} FROM media_files ORDER BY added_at DESC, id",
            RECORD_COLUMNS
        );
        let rows: Vec<RecordRow> = sqlx::query_as::<Postgres, RecordRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Record::try_from).collect()
    }

    #[tracing::instrument(skip(self, changes), fields(db.table = "media_files", db.operation = "commit", changes = changes.len()))]
    async fn commit(&self, changes: Vec<RecordChange>) -> Result<(), AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        for change in &changes {
            Self::apply_change(tx.conn()?, change).await?;
        }

        tx.commit().await?;
        tracing::debug!(changes = changes.len(), "Record store commit successful");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "identities", db.operation = "select"))]
    async fn find_identity_by_name(&self, name: &str) -> Result<Option<Identity>, AppError> {
        let identity = sqlx::query_as::<Postgres, Identity>(
            "SELECT id, name, credential, role FROM identities WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(identity)
    }

    #[tracing::instrument(skip(self, identity), fields(db.table = "identities", db.operation = "insert", identity = %identity.name))]
    async fn create_identity(&self, identity: &Identity) -> Result<(), AppError> {
        sqlx::query("INSERT INTO identities (id, name, credential, role) VALUES ($1, $2, $3, $4)")
            .bind(identity.id)
            .bind(&identity.name)
            .bind(&identity.credential)
            .bind(identity.role)
            .execute(&self.pool)
            .await
            .map_err(map_write_error)?;
        Ok(())
    }
}
