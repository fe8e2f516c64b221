//! List users query

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::features::users::{User, USER_COLUMNS};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListUsersQuery {
    pub region: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListUsersError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[tracing::instrument(skip(pool))]
pub async fn handle(pool: PgPool, query: ListUsersQuery) -> Result<Vec<User>, ListUsersError> {
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users WHERE ($1::TEXT IS NULL OR region = $1) ORDER BY name"
    );
    Ok(sqlx::query_as(&sql)
        .bind(query.region.as_deref().map(str::trim))
        .fetch_all(&pool)
        .await?)
}
