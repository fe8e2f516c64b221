//! Clear every bundle counter and every active bundle

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tranche_common::auth::verify_admin_password;
use tranche_common::TrancheError;

use super::PasswordCommand;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetCountersResponse {
    pub deleted_counters: u64,
    pub deleted_active_bundles: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ResetCountersError {
    #[error(transparent)]
    Unauthorized(#[from] TrancheError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[tracing::instrument(skip_all)]
pub async fn handle(
    pool: PgPool,
    password_sha256: Option<&str>,
    command: PasswordCommand,
) -> Result<ResetCountersResponse, ResetCountersError> {
    verify_admin_password(&command.password, password_sha256)?;

    let mut tx = pool.begin().await?;
    let deleted_counters = sqlx::query("DELETE FROM bundle_counters")
        .execute(&mut *tx)
        .await?
        .rows_affected();
    let deleted_active_bundles = sqlx::query("DELETE FROM active_bundles")
        .execute(&mut *tx)
        .await?
        .rows_affected();
    tx.commit().await?;

    tracing::warn!(deleted_counters, deleted_active_bundles, "Bundle counters reset");

    Ok(ResetCountersResponse {
        deleted_counters,
        deleted_active_bundles,
    })
}
