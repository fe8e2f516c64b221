//! Allocate bundle command

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tranche_common::codes::check_sub_region_code;
use tranche_common::counter::{allocate_bundle, CounterKey, RetryPolicy};
use tranche_common::TrancheError;

use crate::features::bundle_counters::PgCounterStore;
use crate::features::shared::validation::{require, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocateBundleCommand {
    pub region: String,
    pub sub_region: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocateBundleResponse {
    pub region: String,
    pub sub_region: String,
    pub bundle_number: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum AllocateBundleError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Counter(#[from] TrancheError),
}

impl AllocateBundleCommand {
    pub fn validate(&self) -> Result<(), AllocateBundleError> {
        require(&self.region, "region", 100)?;
        require(&self.sub_region, "sub_region", 100)?;
        check_sub_region_code(&self.sub_region)?;
        Ok(())
    }

    fn key(&self) -> CounterKey {
        CounterKey::new(&self.region, &self.sub_region)
    }
}

/// Issue the next bundle number of `(region, sub_region)`.
///
/// Concurrent callers never receive the same number. Fails with
/// [`TrancheError::AllocationConflict`] once `policy` is exhausted.
#[tracing::instrument(
    skip(pool, policy, command),
    fields(region = %command.region, sub_region = %command.sub_region)
)]
pub async fn handle(
    pool: PgPool,
    policy: RetryPolicy,
    command: AllocateBundleCommand,
) -> Result<AllocateBundleResponse, AllocateBundleError> {
    command.validate()?;

    let key = command.key();
    let store = PgCounterStore::new(pool);
    let bundle_number = allocate_bundle(&store, &key, &policy).await?;

    tracing::info!(bundle_number, "Bundle allocated");

    Ok(AllocateBundleResponse {
        region: key.region,
        sub_region: key.sub_region,
        bundle_number,
    })
}
