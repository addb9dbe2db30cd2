//! Database transaction utilities
//!
//! A record-store commit spans several statements that must land together;
//! [`TransactionGuard`] wraps the `sqlx` transaction for that window.

use mediagate_core::AppError;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

/// A database transaction that rolls back unless explicitly committed
///
/// # Example
///
/// ```ignore
/// use mediagate_db::TransactionGuard;
///
/// async fn example(pool: &sqlx::PgPool) -> Result<(), mediagate_core::AppError> {
///     let mut tx = TransactionGuard::begin(pool).await?;
///     sqlx::query("DELETE FROM media_files WHERE id = $1")
///         .bind(uuid::Uuid::new_v4())
///         .execute(tx.conn()?)
///         .await?;
///     tx.commit().await
/// }
/// ```
pub struct TransactionGuard<'a> {
    transaction: Option<Transaction<'a, Postgres>>,
}

impl<'a> TransactionGuard<'a> {
    /// Begin a new database transaction
    pub async fn begin(pool: &'a PgPool) -> Result<Self, AppError> {
        let transaction = pool.begin().await?;
        Ok(Self {
            transaction: Some(transaction),
        })
    }

    /// Connection bound to the open transaction.
    pub fn conn(&mut self) -> Result<&mut PgConnection, AppError> {
        self.transaction
            .as_deref_mut()
            .ok_or_else(|| AppError::Internal("Transaction already finished".to_string()))
    }

    /// Commit the transaction
    pub async fn commit(mut self) -> Result<(), AppError> {
        if let Some(tx) = self.transaction.take() {
            tx.commit().await?;
        }
        Ok(())
    }
}

impl<'a> Drop for TransactionGuard<'a> {
    fn drop(&mut self) {
        // sqlx queues the rollback when the inner transaction is dropped
        if self.transaction.is_some() {
            tracing::debug!("Transaction dropped without commit - rolling back");
        }
    }
}
