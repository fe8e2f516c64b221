//! Delete every processed record

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tranche_common::auth::verify_admin_password;
use tranche_common::TrancheError;

use super::PasswordCommand;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurgeRecordsResponse {
    pub deleted_records: u64,
    pub deleted_flags: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum PurgeRecordsError {
    #[error(transparent)]
    Unauthorized(#[from] TrancheError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Nothing is deleted unless `command.password` matches `password_sha256`.
#[tracing::instrument(skip_all)]
pub async fn handle(
    pool: PgPool,
    password_sha256: Option<&str>,
    command: PasswordCommand,
) -> Result<PurgeRecordsResponse, PurgeRecordsError> {
    verify_admin_password(&command.password, password_sha256)?;

    let mut tx = pool.begin().await?;
    let deleted_records = sqlx::query("DELETE FROM processed_records")
        .execute(&mut *tx)
        .await?
        .rows_affected();
    let deleted_flags = sqlx::query("DELETE FROM bundle_flags")
        .execute(&mut *tx)
        .await?
        .rows_affected();
    tx.commit().await?;

    tracing::warn!(deleted_records, deleted_flags, "All processed records purged");

    Ok(PurgeRecordsResponse {
        deleted_records,
        deleted_flags,
    })
}
