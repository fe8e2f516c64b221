//! Publish a worker's progress on a bundle it still holds

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tranche_common::codes::canonical_sub_region;
use tranche_common::types::ActiveBundle;
use tranche_common::BUNDLE_CAPACITY;

use crate::features::shared::validation::{require, require_bundle_number, ValidationError};
use crate::features::user_states::ActiveBundleRow;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateBundleCountCommand {
    #[serde(default)]
    pub worker_id: String,
    #[serde(default)]
    pub sub_region: String,
    pub bundle_number: i64,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateBundleCountResponse {
    /// `false` when the worker no longer holds this bundle.
    pub updated: bool,
    pub active_bundle: Option<ActiveBundle>,
}

#[derive(Debug, thiserror::Error)]
pub enum UpdateBundleCountError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("count must be between 0 and {max}, got {0}", max = BUNDLE_CAPACITY)]
    CountOutOfRange(i64),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl UpdateBundleCountCommand {
    pub fn validate(&self) -> Result<(), UpdateBundleCountError> {
        require(&self.worker_id, "worker_id", 128)?;
        require(&self.sub_region, "sub_region", 100)?;
        require_bundle_number(self.bundle_number)?;
        if !(0..=i64::from(BUNDLE_CAPACITY)).contains(&self.count) {
            return Err(UpdateBundleCountError::CountOutOfRange(self.count));
        }
        Ok(())
    }
}

/// Raise the count of the worker's active bundle.
///
/// Only a row that still exists with the same bundle number is touched, so a
/// bundle an administrator reset, force-completed or reassigned is never
/// brought back. Counts only grow; a late, smaller count is ignored.
#[tracing::instrument(
    skip(pool, command),
    fields(worker = %command.worker_id, sub_region = %command.sub_region)
)]
pub async fn handle(
    pool: PgPool,
    command: UpdateBundleCountCommand,
) -> Result<UpdateBundleCountResponse, UpdateBundleCountError> {
    command.validate()?;

    let row = sqlx::query_as::<_, ActiveBundleRow>(
        r#"
        UPDATE active_bundles
        SET count = GREATEST(count, $4), updated_at = NOW()
        WHERE worker_id = $1 AND sub_region = $2 AND bundle_number = $3
        RETURNING sub_region, bundle_number, count
        "#,
    )
    .bind(command.worker_id.trim())
    .bind(canonical_sub_region(&command.sub_region))
    .bind(command.bundle_number as i32)
    .bind(command.count as i32)
    .fetch_optional(&pool)
    .await?;

    if row.is_none() {
        tracing::info!(bundle = command.bundle_number, "Count update for a bundle the worker no longer holds");
    }

    Ok(UpdateBundleCountResponse {
        updated: row.is_some(),
        active_bundle: row.map(ActiveBundle::from),
    })
}
