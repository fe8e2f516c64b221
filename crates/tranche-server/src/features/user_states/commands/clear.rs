//! Delete a worker's whole state record

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::features::shared::validation::{require, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearUserStateCommand {
    pub worker_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearUserStateResponse {
    pub removed_bundles: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ClearUserStateError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[tracing::instrument(skip(pool, command), fields(worker = %command.worker_id))]
pub async fn handle(
    pool: PgPool,
    command: ClearUserStateCommand,
) -> Result<ClearUserStateResponse, ClearUserStateError> {
    require(&command.worker_id, "worker_id", 128)?;

    let result = sqlx::query("DELETE FROM active_bundles WHERE worker_id = $1")
        .bind(command.worker_id.trim())
        .execute(&pool)
        .await?;

    tracing::info!(removed = result.rows_affected(), "Worker state cleared");

    Ok(ClearUserStateResponse {
        removed_bundles: result.rows_affected(),
    })
}
