//! Reset a worker's progress on its active bundle
//!
//! Deletes the records the worker wrote for the bundle, clears the active
//! bundle, signals the worker, and returns the number to the gap pool so the
//! next allocation in the sub-region reissues it.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tranche_common::counter::{recycle_bundle, CounterKey, RetryPolicy};
use tranche_common::types::SignalKind;
use tranche_common::TrancheError;

use crate::features::admin::{
    delete_active_bundle, lock_active_bundle, worker_region, WorkerBundleTarget,
};
use crate::features::bundle_counters::PgCounterStore;
use crate::features::shared::validation::ValidationError;
use crate::features::signals::write_signal;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetProgressResponse {
    pub worker_id: String,
    pub sub_region: String,
    pub bundle_number: u32,
    pub deleted_records: u64,
    pub recycled: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ResetProgressError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Worker '{0}' not found")]
    WorkerNotFound(String),

    #[error("Worker '{worker_id}' has no active bundle for '{sub_region}'")]
    NoActiveBundle {
        worker_id: String,
        sub_region: String,
    },

    #[error(transparent)]
    Counter(#[from] TrancheError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[tracing::instrument(skip(pool, policy), fields(worker = %target.worker_id, sub_region = %target.sub_region))]
pub async fn handle(
    pool: PgPool,
    policy: RetryPolicy,
    target: WorkerBundleTarget,
) -> Result<ResetProgressResponse, ResetProgressError> {
    target.validate()?;

    let mut tx = pool.begin().await?;

    let region = worker_region(&mut *tx, target.worker_id())
        .await?
        .ok_or_else(|| ResetProgressError::WorkerNotFound(target.worker_id().to_string()))?;

    let bundle_number = lock_active_bundle(&mut *tx, &target).await?.ok_or_else(|| {
        ResetProgressError::NoActiveBundle {
            worker_id: target.worker_id().to_string(),
            sub_region: target.sub_region(),
        }
    })?;

    let deleted = sqlx::query(
        r#"
        DELETE FROM processed_records
        WHERE region = $1 AND sub_region = $2 AND bundle_number = $3 AND processed_by = $4
        "#,
    )
    .bind(&region)
    .bind(target.sub_region())
    .bind(bundle_number as i32)
    .bind(target.worker_id())
    .execute(&mut *tx)
    .await?
    .rows_affected();

    delete_active_bundle(&mut *tx, &target).await?;
    write_signal(&mut *tx, target.worker_id(), &target.sub_region(), SignalKind::Reset).await?;

    tx.commit().await?;

    // The bundle is already released; a failed recycle only loses the number.
    let key = CounterKey::new(&region, &target.sub_region());
    let recycled = recycle_bundle(&PgCounterStore::new(pool), &key, bundle_number, &policy).await?;

    tracing::info!(bundle_number, deleted, recycled, "Bundle progress reset");

    Ok(ResetProgressResponse {
        worker_id: target.worker_id().to_string(),
        sub_region: target.sub_region(),
        bundle_number,
        deleted_records: deleted,
        recycled,
    })
}
