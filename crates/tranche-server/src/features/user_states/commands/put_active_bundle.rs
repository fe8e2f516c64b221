//! Record a bundle a worker has just been allocated

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tranche_common::codes::canonical_sub_region;
use tranche_common::types::ActiveBundle;
use tranche_common::BUNDLE_CAPACITY;

use crate::features::shared::validation::{require, require_bundle_number, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PutActiveBundleCommand {
    #[serde(default)]
    pub worker_id: String,
    #[serde(default)]
    pub sub_region: String,
    pub bundle_number: i64,
    pub count: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum PutActiveBundleError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("count must be between 0 and {max}, got {0}", max = BUNDLE_CAPACITY)]
    CountOutOfRange(i64),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl PutActiveBundleCommand {
    pub fn validate(&self) -> Result<(), PutActiveBundleError> {
        require(&self.worker_id, "worker_id", 128)?;
        require(&self.sub_region, "sub_region", 100)?;
        require_bundle_number(self.bundle_number)?;
        if !(0..=i64::from(BUNDLE_CAPACITY)).contains(&self.count) {
            return Err(PutActiveBundleError::CountOutOfRange(self.count));
        }
        Ok(())
    }
}

#[tracing::instrument(
    skip(pool, command),
    fields(worker = %command.worker_id, sub_region = %command.sub_region)
)]
pub async fn handle(
    pool: PgPool,
    command: PutActiveBundleCommand,
) -> Result<ActiveBundle, PutActiveBundleError> {
    command.validate()?;
    let sub_region = canonical_sub_region(&command.sub_region);

    sqlx::query(
        r#"
        INSERT INTO active_bundles (worker_id, sub_region, bundle_number, count)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (worker_id, sub_region)
        DO UPDATE SET bundle_number = EXCLUDED.bundle_number,
                      count = EXCLUDED.count,
                      updated_at = NOW()
        "#,
    )
    .bind(command.worker_id.trim())
    .bind(&sub_region)
    .bind(command.bundle_number as i32)
    .bind(command.count as i32)
    .execute(&pool)
    .await?;

    tracing::debug!(
        bundle = command.bundle_number,
        count = command.count,
        "Active bundle stored"
    );

    Ok(ActiveBundle {
        sub_region,
        bundle_number: command.bundle_number as u32,
        count: command.count as u32,
    })
}
