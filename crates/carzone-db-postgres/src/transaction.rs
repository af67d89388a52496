//! Transaction helpers.
//!
//! A transaction that is dropped without [`commit`] issues a `ROLLBACK`, so an
//! early `?` return or a cancelled request leaves no partial write behind.

use sqlx_core::error::Error as SqlxError;
use sqlx_postgres::{PgPool, PgTransaction};

use carzone_storage::StorageError;

pub(crate) async fn begin(pool: &PgPool) -> Result<PgTransaction<'static>, StorageError> {
    pool.begin().await.map_err(|e| match e {
        SqlxError::PoolTimedOut | SqlxError::PoolClosed => {
            StorageError::connection_error(format!("Failed to begin transaction: {e}"))
        }
        other => StorageError::transaction_error(format!("Failed to begin transaction: {other}")),
    })
}

pub(crate) async fn commit(tx: PgTransaction<'static>) -> Result<(), StorageError> {
    tx.commit()
        .await
        .map_err(|e| StorageError::transaction_error(format!("Failed to commit transaction: {e}")))?;
    tracing::debug!("Transaction committed successfully");
    Ok(())
}
