//! Upload dataset command

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use tranche_common::types::{DatasetSummary, FieldMap};
use uuid::Uuid;

use crate::features::datasets::SummaryRow;
use crate::features::shared::db_errors::is_unique_violation;
use crate::features::shared::validation::{require, ValidationError};

/// Rows arrive already parsed; every cell is kept exactly as sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadDatasetCommand {
    #[serde(default)]
    pub region: String,
    pub name: String,
    /// Size of the source file, when known.
    #[serde(default)]
    pub size_bytes: Option<i64>,
    pub rows: Vec<FieldMap>,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadDatasetError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Dataset has no rows")]
    Empty,

    #[error("A dataset named '{0}' already exists in this region")]
    Duplicate(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl UploadDatasetCommand {
    pub fn validate(&self) -> Result<(), UploadDatasetError> {
        require(&self.region, "region", 100)?;
        require(&self.name, "name", 255)?;
        if self.rows.is_empty() {
            return Err(UploadDatasetError::Empty);
        }
        Ok(())
    }
}

#[tracing::instrument(skip(pool, command), fields(region = %command.region, name = %command.name, rows = command.rows.len()))]
pub async fn handle(
    pool: PgPool,
    command: UploadDatasetCommand,
) -> Result<DatasetSummary, UploadDatasetError> {
    command.validate()?;

    let size_bytes = match command.size_bytes {
        Some(size) if size > 0 => size,
        _ => serde_json::to_vec(&command.rows)?.len() as i64,
    };

    let row: SummaryRow = sqlx::query_as(
        r#"
        INSERT INTO datasets (id, region, name, size_bytes, record_count, rows)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, region, name, size_bytes, record_count, uploaded_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(command.region.trim())
    .bind(command.name.trim())
    .bind(size_bytes)
    .bind(command.rows.len() as i64)
    .bind(Json(&command.rows))
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            UploadDatasetError::Duplicate(command.name.trim().to_string())
        } else {
            UploadDatasetError::Database(e)
        }
    })?;

    tracing::info!(dataset_id = %row.id, "Dataset uploaded");
    Ok(row.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_dataset_is_rejected() {
        let command = UploadDatasetCommand {
            region: "ahilyanagar".into(),
            name: "survey.csv".into(),
            size_bytes: None,
            rows: vec![],
        };
        assert!(matches!(command.validate(), Err(UploadDatasetError::Empty)));
    }

    #[test]
    fn test_name_required() {
        let command = UploadDatasetCommand {
            region: "ahilyanagar".into(),
            name: "".into(),
            size_bytes: None,
            rows: vec![FieldMap::new()],
        };
        assert!(matches!(
            command.validate(),
            Err(UploadDatasetError::Validation(ValidationError::Required("name")))
        ));
    }
}
