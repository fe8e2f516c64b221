//! Fetch a dataset with its rows by name

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tranche_common::types::Dataset;

use crate::features::datasets::DatasetRow;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetDatasetQuery {
    pub region: String,
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GetDatasetError {
    #[error("Dataset '{name}' not found in region '{region}'")]
    NotFound { region: String, name: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[tracing::instrument(skip(pool))]
pub async fn handle(pool: PgPool, query: GetDatasetQuery) -> Result<Dataset, GetDatasetError> {
    let row: Option<DatasetRow> = sqlx::query_as(
        r#"
        SELECT id, region, name, size_bytes, record_count, uploaded_at, rows
        FROM datasets
        WHERE region = $1 AND name = $2
        "#,
    )
    .bind(query.region.trim())
    .bind(query.name.trim())
    .fetch_optional(&pool)
    .await?;

    row.map(Dataset::from).ok_or(GetDatasetError::NotFound {
        region: query.region,
        name: query.name,
    })
}
