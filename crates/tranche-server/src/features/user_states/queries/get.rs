//! Read a worker's active bundles

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tranche_common::types::ActiveBundles;

use crate::features::user_states::ActiveBundleRow;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetUserStateQuery {
    pub worker_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStateView {
    pub worker_id: String,
    pub active_bundles: ActiveBundles,
}

#[derive(Debug, thiserror::Error)]
pub enum GetUserStateError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A worker without any record has an empty map.
#[tracing::instrument(skip(pool, query), fields(worker = %query.worker_id))]
pub async fn handle(pool: PgPool, query: GetUserStateQuery) -> Result<UserStateView, GetUserStateError> {
    let rows: Vec<ActiveBundleRow> = sqlx::query_as(
        r#"
        SELECT sub_region, bundle_number, count
        FROM active_bundles
        WHERE worker_id = $1
        ORDER BY sub_region
        "#,
    )
    .bind(query.worker_id.trim())
    .fetch_all(&pool)
    .await?;

    let active_bundles = rows
        .into_iter()
        .map(|row| (row.sub_region.clone(), row.into()))
        .collect();

    Ok(UserStateView {
        worker_id: query.worker_id,
        active_bundles,
    })
}
