//! Uploaded source datasets (`files/{region}/{datasetId}`)

pub mod commands;
pub mod queries;
pub mod routes;

pub use routes::datasets_routes;

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use tranche_common::types::{Dataset, DatasetSummary, FieldMap};
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SummaryRow {
    pub id: Uuid,
    pub region: String,
    pub name: String,
    pub size_bytes: i64,
    pub record_count: i64,
    pub uploaded_at: DateTime<Utc>,
}

impl From<SummaryRow> for DatasetSummary {
    fn from(row: SummaryRow) -> Self {
        DatasetSummary {
            id: row.id.to_string(),
            region: row.region,
            name: row.name,
            size_bytes: row.size_bytes,
            record_count: row.record_count,
            uploaded_at: row.uploaded_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct DatasetRow {
    #[sqlx(flatten)]
    pub summary: SummaryRow,
    pub rows: Json<Vec<FieldMap>>,
}

impl From<DatasetRow> for Dataset {
    fn from(row: DatasetRow) -> Self {
        Dataset {
            summary: row.summary.into(),
            rows: row.rows.0,
        }
    }
}
