//! Delete user command

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteUserCommand {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteUserResponse {
    pub id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteUserError {
    #[error("User '{0}' not found")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Deletes the identity and the worker's active bundles. Processed records
/// are kept.
#[tracing::instrument(skip(pool, command), fields(user_id = %command.id))]
pub async fn handle(
    pool: PgPool,
    command: DeleteUserCommand,
) -> Result<DeleteUserResponse, DeleteUserError> {
    let mut tx = pool.begin().await?;

    let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(command.id.trim())
        .execute(&mut *tx)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(DeleteUserError::NotFound(command.id));
    }

    sqlx::query("DELETE FROM active_bundles WHERE worker_id = $1")
        .bind(command.id.trim())
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM override_signals WHERE worker_id = $1")
        .bind(command.id.trim())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    tracing::info!("User deleted");

    Ok(DeleteUserResponse { id: command.id })
}
