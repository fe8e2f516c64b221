//! Administrative overrides
//!
//! Per-worker actions (`reset-progress`, `force-complete`, `manual-assign`,
//! `release`) change a worker's active bundles from outside. Bulk actions
//! (`purge-processed-records`, `reset-counters`) need the admin password.

pub mod commands;
pub mod routes;

pub use routes::admin_routes;

use serde::{Deserialize, Serialize};
use tranche_common::codes::canonical_sub_region;

use crate::features::shared::validation::{require, ValidationError};

/// Identifies one active bundle slot of a worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerBundleTarget {
    pub worker_id: String,
    pub sub_region: String,
}

impl WorkerBundleTarget {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.worker_id, "worker_id", 128)?;
        require(&self.sub_region, "sub_region", 100)?;
        Ok(())
    }

    pub fn worker_id(&self) -> &str {
        self.worker_id.trim()
    }

    /// Canonical spelling of the target sub-region.
    pub fn sub_region(&self) -> String {
        canonical_sub_region(&self.sub_region)
    }
}

/// Region the worker is assigned to.
pub(crate) async fn worker_region<'e, E>(
    executor: E,
    worker_id: &str,
) -> Result<Option<String>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let region: Option<(String,)> = sqlx::query_as("SELECT region FROM users WHERE id = $1")
        .bind(worker_id)
        .fetch_optional(executor)
        .await?;
    Ok(region.map(|(r,)| r))
}

/// Bundle number of the worker's active bundle, locked for the rest of the
/// transaction.
pub(crate) async fn lock_active_bundle<'e, E>(
    executor: E,
    target: &WorkerBundleTarget,
) -> Result<Option<u32>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let row: Option<(i32,)> = sqlx::query_as(
        r#"
        SELECT bundle_number FROM active_bundles
        WHERE worker_id = $1 AND sub_region = $2
        FOR UPDATE
        "#,
    )
    .bind(target.worker_id())
    .bind(target.sub_region())
    .fetch_optional(executor)
    .await?;
    Ok(row.map(|(n,)| n as u32))
}

pub(crate) async fn delete_active_bundle<'e, E>(
    executor: E,
    target: &WorkerBundleTarget,
) -> Result<bool, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM active_bundles WHERE worker_id = $1 AND sub_region = $2")
        .bind(target.worker_id())
        .bind(target.sub_region())
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}
