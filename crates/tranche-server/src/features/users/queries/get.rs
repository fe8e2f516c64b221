//! Get user query

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::features::users::{User, USER_COLUMNS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetUserQuery {
    pub id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GetUserError {
    #[error("User '{0}' not found")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[tracing::instrument(skip(pool))]
pub async fn handle(pool: PgPool, query: GetUserQuery) -> Result<User, GetUserError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    sqlx::query_as(&sql)
        .bind(query.id.trim())
        .fetch_optional(&pool)
        .await?
        .ok_or(GetUserError::NotFound(query.id))
}
