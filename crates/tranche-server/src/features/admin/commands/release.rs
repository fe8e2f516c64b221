//! Release a worker's active bundle without touching its records

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::features::admin::{delete_active_bundle, lock_active_bundle, WorkerBundleTarget};
use crate::features::shared::validation::ValidationError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseResponse {
    pub worker_id: String,
    pub sub_region: String,
    pub bundle_number: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum ReleaseError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Worker '{worker_id}' has no active bundle for '{sub_region}'")]
    NoActiveBundle {
        worker_id: String,
        sub_region: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[tracing::instrument(skip(pool), fields(worker = %target.worker_id, sub_region = %target.sub_region))]
pub async fn handle(pool: PgPool, target: WorkerBundleTarget) -> Result<ReleaseResponse, ReleaseError> {
    target.validate()?;

    let mut tx = pool.begin().await?;
    let bundle_number = lock_active_bundle(&mut *tx, &target).await?.ok_or_else(|| {
        ReleaseError::NoActiveBundle {
            worker_id: target.worker_id().to_string(),
            sub_region: target.sub_region(),
        }
    })?;
    delete_active_bundle(&mut *tx, &target).await?;
    tx.commit().await?;

    tracing::info!(bundle_number, "Active bundle released");

    Ok(ReleaseResponse {
        worker_id: target.worker_id().to_string(),
        sub_region: target.sub_region(),
        bundle_number,
    })
}
