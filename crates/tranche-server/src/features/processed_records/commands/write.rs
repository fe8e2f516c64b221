//! Write processed record command

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use tranche_common::codes::canonical_sub_region;
use tranche_common::types::FieldMap;

use crate::features::shared::validation::{require, require_bundle_number, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteRecordCommand {
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub sub_region: String,
    #[serde(default)]
    pub bundle_number: i64,
    #[serde(default)]
    pub unique_id: String,
    pub fields: FieldMap,
    pub processed_by: String,
    pub processed_at: DateTime<Utc>,
    pub source_dataset_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteRecordResponse {
    pub unique_id: String,
    pub bundle_number: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum WriteRecordError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl WriteRecordCommand {
    pub fn validate(&self) -> Result<(), WriteRecordError> {
        require(&self.region, "region", 100)?;
        require(&self.sub_region, "sub_region", 100)?;
        require_bundle_number(self.bundle_number)?;
        require(&self.unique_id, "unique_id", 64)?;
        require(&self.processed_by, "processed_by", 128)?;
        require(&self.source_dataset_name, "source_dataset_name", 255)?;
        Ok(())
    }
}

/// Upsert the record at its composite key.
#[tracing::instrument(
    skip(pool, command),
    fields(region = %command.region, sub_region = %command.sub_region, unique_id = %command.unique_id)
)]
pub async fn handle(
    pool: PgPool,
    command: WriteRecordCommand,
) -> Result<WriteRecordResponse, WriteRecordError> {
    command.validate()?;

    sqlx::query(
        r#"
        INSERT INTO processed_records
            (region, sub_region, bundle_number, unique_id, fields,
             processed_by, processed_at, source_dataset_name)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (region, sub_region, bundle_number, unique_id)
        DO UPDATE SET fields = EXCLUDED.fields,
                      processed_by = EXCLUDED.processed_by,
                      processed_at = EXCLUDED.processed_at,
                      source_dataset_name = EXCLUDED.source_dataset_name
        "#,
    )
    .bind(command.region.trim())
    .bind(canonical_sub_region(&command.sub_region))
    .bind(command.bundle_number as i32)
    .bind(command.unique_id.trim())
    .bind(Json(&command.fields))
    .bind(command.processed_by.trim())
    .bind(command.processed_at)
    .bind(command.source_dataset_name.trim())
    .execute(&pool)
    .await?;

    tracing::debug!("Processed record written");

    Ok(WriteRecordResponse {
        unique_id: command.unique_id,
        bundle_number: command.bundle_number as u32,
    })
}
