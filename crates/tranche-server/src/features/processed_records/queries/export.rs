//! Export processed records of a region

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use tranche_common::types::FieldMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRecordsQuery {
    pub region: String,
}

/// A processed record joined with the identity of the worker who made it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedRecord {
    pub sub_region: String,
    pub bundle_number: u32,
    pub unique_id: String,
    pub fields: FieldMap,
    pub processed_by: String,
    pub processed_by_name: Option<String>,
    pub processed_by_mobile: Option<String>,
    pub processed_at: DateTime<Utc>,
    pub source_dataset_name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportRecordsError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(sqlx::FromRow)]
struct ExportRow {
    sub_region: String,
    bundle_number: i32,
    unique_id: String,
    fields: Json<FieldMap>,
    processed_by: String,
    name: Option<String>,
    mobile: Option<String>,
    processed_at: DateTime<Utc>,
    source_dataset_name: String,
}

impl From<ExportRow> for ExportedRecord {
    fn from(row: ExportRow) -> Self {
        ExportedRecord {
            sub_region: row.sub_region,
            bundle_number: row.bundle_number as u32,
            unique_id: row.unique_id,
            fields: row.fields.0,
            processed_by: row.processed_by,
            processed_by_name: row.name,
            processed_by_mobile: row.mobile,
            processed_at: row.processed_at,
            source_dataset_name: row.source_dataset_name,
        }
    }
}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: PgPool,
    query: ExportRecordsQuery,
) -> Result<Vec<ExportedRecord>, ExportRecordsError> {
    let rows: Vec<ExportRow> = sqlx::query_as(
        r#"
        SELECT r.sub_region, r.bundle_number, r.unique_id, r.fields, r.processed_by,
               u.name, u.mobile, r.processed_at, r.source_dataset_name
        FROM processed_records r
        LEFT JOIN users u ON u.id = r.processed_by
        WHERE r.region = $1
        ORDER BY r.sub_region, r.bundle_number, r.processed_at, r.unique_id
        "#,
    )
    .bind(query.region.trim())
    .fetch_all(&pool)
    .await?;

    tracing::info!(count = rows.len(), "Exported processed records");
    Ok(rows.into_iter().map(ExportedRecord::from).collect())
}
