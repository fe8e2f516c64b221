//! Acknowledge (delete) a signal

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tranche_common::codes::canonical_sub_region;

use crate::features::shared::validation::{require, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcknowledgeSignalCommand {
    pub worker_id: String,
    pub sub_region: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcknowledgeSignalResponse {
    /// `false` when there was nothing left to acknowledge.
    pub deleted: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum AcknowledgeSignalError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Idempotent: acknowledging twice is not an error.
#[tracing::instrument(
    skip(pool, command),
    fields(worker = %command.worker_id, sub_region = %command.sub_region)
)]
pub async fn handle(
    pool: PgPool,
    command: AcknowledgeSignalCommand,
) -> Result<AcknowledgeSignalResponse, AcknowledgeSignalError> {
    require(&command.worker_id, "worker_id", 128)?;
    require(&command.sub_region, "sub_region", 100)?;

    let result =
        sqlx::query("DELETE FROM override_signals WHERE worker_id = $1 AND sub_region = $2")
            .bind(command.worker_id.trim())
            .bind(canonical_sub_region(&command.sub_region))
            .execute(&pool)
            .await?;

    Ok(AcknowledgeSignalResponse {
        deleted: result.rows_affected() > 0,
    })
}
