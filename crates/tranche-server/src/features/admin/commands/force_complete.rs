//! Mark a worker's active bundle complete regardless of its count

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::features::admin::{
    delete_active_bundle, lock_active_bundle, worker_region, WorkerBundleTarget,
};
use crate::features::shared::validation::ValidationError;

/// Recorded as `force_completed_by`.
pub const FORCE_COMPLETED_BY: &str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForceCompleteResponse {
    pub region: String,
    pub sub_region: String,
    pub bundle_number: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum ForceCompleteError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Worker '{0}' not found")]
    WorkerNotFound(String),

    #[error("Worker '{worker_id}' has no active bundle for '{sub_region}'")]
    NoActiveBundle {
        worker_id: String,
        sub_region: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[tracing::instrument(skip(pool), fields(worker = %target.worker_id, sub_region = %target.sub_region))]
pub async fn handle(
    pool: PgPool,
    target: WorkerBundleTarget,
) -> Result<ForceCompleteResponse, ForceCompleteError> {
    target.validate()?;

    let mut tx = pool.begin().await?;

    let region = worker_region(&mut *tx, target.worker_id())
        .await?
        .ok_or_else(|| ForceCompleteError::WorkerNotFound(target.worker_id().to_string()))?;

    let bundle_number = lock_active_bundle(&mut *tx, &target).await?.ok_or_else(|| {
        ForceCompleteError::NoActiveBundle {
            worker_id: target.worker_id().to_string(),
            sub_region: target.sub_region(),
        }
    })?;

    sqlx::query(
        r#"
        INSERT INTO bundle_flags (region, sub_region, bundle_number, is_force_completed, force_completed_by)
        VALUES ($1, $2, $3, TRUE, $4)
        ON CONFLICT (region, sub_region, bundle_number)
        DO UPDATE SET is_force_completed = TRUE,
                      force_completed_by = EXCLUDED.force_completed_by,
                      updated_at = NOW()
        "#,
    )
    .bind(&region)
    .bind(target.sub_region())
    .bind(bundle_number as i32)
    .bind(FORCE_COMPLETED_BY)
    .execute(&mut *tx)
    .await?;

    delete_active_bundle(&mut *tx, &target).await?;
    tx.commit().await?;

    tracing::info!(bundle_number, "Bundle force-completed");

    Ok(ForceCompleteResponse {
        region,
        sub_region: target.sub_region(),
        bundle_number,
    })
}
