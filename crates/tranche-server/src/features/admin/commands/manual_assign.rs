//! Assign a specific bundle number to a worker, bypassing allocation

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tranche_common::codes::check_sub_region_code;
use tranche_common::counter::{reserve_bundle, CounterKey, RetryPolicy};
use tranche_common::types::{ActiveBundle, SignalKind};
use tranche_common::TrancheError;

use crate::features::admin::{worker_region, WorkerBundleTarget};
use crate::features::bundle_counters::PgCounterStore;
use crate::features::shared::validation::{require_bundle_number, ValidationError};
use crate::features::signals::write_signal;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualAssignCommand {
    #[serde(flatten)]
    pub target: WorkerBundleTarget,
    pub bundle_number: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualAssignResponse {
    pub worker_id: String,
    pub active_bundle: ActiveBundle,
    /// Whether the counter had to change so allocation never issues this number.
    pub counter_adjusted: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ManualAssignError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Worker '{0}' not found")]
    WorkerNotFound(String),

    #[error("Bundle {bundle_number} of '{sub_region}' is active for worker '{holder}'")]
    HeldByAnotherWorker {
        sub_region: String,
        bundle_number: u32,
        holder: String,
    },

    #[error(transparent)]
    Counter(#[from] TrancheError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ManualAssignCommand {
    pub fn validate(&self) -> Result<(), ManualAssignError> {
        self.target.validate()?;
        require_bundle_number(self.bundle_number)?;
        check_sub_region_code(&self.target.sub_region)?;
        Ok(())
    }
}

#[tracing::instrument(
    skip(pool, policy, command),
    fields(worker = %command.target.worker_id, sub_region = %command.target.sub_region, bundle = command.bundle_number)
)]
pub async fn handle(
    pool: PgPool,
    policy: RetryPolicy,
    command: ManualAssignCommand,
) -> Result<ManualAssignResponse, ManualAssignError> {
    command.validate()?;

    let target = &command.target;
    let sub_region = target.sub_region();
    let bundle_number = command.bundle_number as u32;

    let region = worker_region(&pool, target.worker_id())
        .await?
        .ok_or_else(|| ManualAssignError::WorkerNotFound(target.worker_id().to_string()))?;

    // The counter moves before anyone holds the number, so a concurrent
    // allocation can no longer hand it out.
    let key = CounterKey::new(&region, &sub_region);
    let counter_adjusted =
        reserve_bundle(&PgCounterStore::new(pool.clone()), &key, bundle_number, &policy).await?;

    let mut tx = pool.begin().await?;

    let holder: Option<(String,)> = sqlx::query_as(
        r#"
        SELECT a.worker_id
        FROM active_bundles a
        JOIN users u ON u.id = a.worker_id
        WHERE u.region = $1
          AND a.sub_region = $2
          AND a.bundle_number = $3
          AND a.worker_id <> $4
        LIMIT 1
        FOR UPDATE OF a
        "#,
    )
    .bind(&region)
    .bind(&sub_region)
    .bind(bundle_number as i32)
    .bind(target.worker_id())
    .fetch_optional(&mut *tx)
    .await?;

    if let Some((holder,)) = holder {
        return Err(ManualAssignError::HeldByAnotherWorker {
            sub_region,
            bundle_number,
            holder,
        });
    }

    sqlx::query(
        r#"
        INSERT INTO active_bundles (worker_id, sub_region, bundle_number, count)
        VALUES ($1, $2, $3, 0)
        ON CONFLICT (worker_id, sub_region)
        DO UPDATE SET bundle_number = EXCLUDED.bundle_number, count = 0, updated_at = NOW()
        "#,
    )
    .bind(target.worker_id())
    .bind(&sub_region)
    .bind(bundle_number as i32)
    .execute(&mut *tx)
    .await?;

    write_signal(
        &mut *tx,
        target.worker_id(),
        &sub_region,
        SignalKind::ManualAssign { bundle_number },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(counter_adjusted, "Bundle manually assigned");

    Ok(ManualAssignResponse {
        worker_id: target.worker_id().to_string(),
        active_bundle: ActiveBundle::new(sub_region, bundle_number),
        counter_adjusted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_number_must_be_positive() {
        let command = ManualAssignCommand {
            target: WorkerBundleTarget {
                worker_id: "w1".into(),
                sub_region: "Kannad".into(),
            },
            bundle_number: 0,
        };
        assert!(matches!(
            command.validate(),
            Err(ManualAssignError::Validation(ValidationError::BundleNumber))
        ));
    }

    #[test]
    fn test_flattened_body() {
        let command: ManualAssignCommand = serde_json::from_value(serde_json::json!({
            "worker_id": "w1",
            "sub_region": "Kannad",
            "bundle_number": 4
        }))
        .unwrap();
        assert_eq!(command.target.sub_region(), "Kannad");
        assert!(command.validate().is_ok());
    }
}
