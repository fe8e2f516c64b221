//! List dataset summaries of a region

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tranche_common::types::DatasetSummary;

use crate::features::datasets::SummaryRow;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListDatasetsQuery {
    pub region: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ListDatasetsError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: PgPool,
    query: ListDatasetsQuery,
) -> Result<Vec<DatasetSummary>, ListDatasetsError> {
    let rows: Vec<SummaryRow> = sqlx::query_as(
        r#"
        SELECT id, region, name, size_bytes, record_count, uploaded_at
        FROM datasets
        WHERE region = $1
        ORDER BY uploaded_at DESC
        "#,
    )
    .bind(query.region.trim())
    .fetch_all(&pool)
    .await?;

    Ok(rows.into_iter().map(DatasetSummary::from).collect())
}
