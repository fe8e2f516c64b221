//! Recycle bundle command

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tranche_common::counter::{recycle_bundle, CounterKey, RetryPolicy};
use tranche_common::TrancheError;

use crate::features::bundle_counters::PgCounterStore;
use crate::features::shared::validation::{require, require_bundle_number, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecycleBundleCommand {
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub sub_region: String,
    pub bundle_number: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecycleBundleResponse {
    pub bundle_number: u32,
    /// `false` when the number was already a gap or was never issued.
    pub recycled: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum RecycleBundleError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Counter(#[from] TrancheError),
}

impl RecycleBundleCommand {
    pub fn validate(&self) -> Result<(), RecycleBundleError> {
        require(&self.region, "region", 100)?;
        require(&self.sub_region, "sub_region", 100)?;
        require_bundle_number(self.bundle_number)?;
        Ok(())
    }
}

/// Put `bundle_number` back into the gap pool. Idempotent.
#[tracing::instrument(
    skip(pool, policy, command),
    fields(region = %command.region, sub_region = %command.sub_region, bundle = command.bundle_number)
)]
pub async fn handle(
    pool: PgPool,
    policy: RetryPolicy,
    command: RecycleBundleCommand,
) -> Result<RecycleBundleResponse, RecycleBundleError> {
    command.validate()?;

    let key = CounterKey::new(&command.region, &command.sub_region);
    let bundle_number = command.bundle_number as u32;
    let recycled = recycle_bundle(&PgCounterStore::new(pool), &key, bundle_number, &policy).await?;

    tracing::info!(recycled, "Bundle recycle processed");

    Ok(RecycleBundleResponse {
        bundle_number,
        recycled,
    })
}
