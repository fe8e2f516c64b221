//! Delete dataset command

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteDatasetCommand {
    pub region: String,
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteDatasetResponse {
    pub id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteDatasetError {
    #[error("Dataset '{0}' not found")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Processed records keep their `source_dataset_name` after the dataset goes.
#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: PgPool,
    command: DeleteDatasetCommand,
) -> Result<DeleteDatasetResponse, DeleteDatasetError> {
    let result = sqlx::query("DELETE FROM datasets WHERE region = $1 AND id = $2")
        .bind(command.region.trim())
        .bind(command.id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DeleteDatasetError::NotFound(command.id));
    }

    tracing::info!("Dataset deleted");
    Ok(DeleteDatasetResponse { id: command.id })
}
