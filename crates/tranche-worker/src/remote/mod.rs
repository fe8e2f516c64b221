//! The worker's view of the canonical remote store
//!
//! Everything the worker protocols need from the server sits behind
//! [`RemoteStore`], implemented over HTTP by [`crate::api::ApiClient`] and
//! in memory by [`memory::MemoryRemote`].

pub mod memory;

use async_trait::async_trait;
use std::collections::BTreeMap;
use tranche_common::types::{ActiveBundle, ActiveBundles, Dataset, OverrideSignal, ProcessedRecord};

use crate::error::Result;

pub use memory::MemoryRemote;

/// Pending override signals of one worker, keyed by sub-region.
pub type Signals = BTreeMap<String, OverrideSignal>;

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Next bundle number for `(region, sub_region)` from the counter service.
    async fn allocate_bundle(&self, region: &str, sub_region: &str) -> Result<u32>;

    /// Return an abandoned bundle number to the gap pool.
    async fn recycle_bundle(&self, region: &str, sub_region: &str, bundle_number: u32)
        -> Result<bool>;

    async fn active_bundles(&self, worker_id: &str) -> Result<ActiveBundles>;

    /// Record a bundle the worker was just allocated.
    async fn put_active_bundle(&self, worker_id: &str, bundle: &ActiveBundle) -> Result<()>;

    /// Publish the count of a bundle the worker still holds. Returns `false`
    /// and changes nothing when the remote no longer has this bundle number
    /// for the worker.
    async fn update_bundle_count(&self, worker_id: &str, bundle: &ActiveBundle) -> Result<bool>;

    async fn remove_active_bundle(&self, worker_id: &str, sub_region: &str) -> Result<bool>;

    /// Delete every active bundle of the worker.
    async fn clear_user_state(&self, worker_id: &str) -> Result<u64>;

    async fn signals(&self, worker_id: &str) -> Result<Signals>;

    /// Delete a handled signal. Deleting a missing one is not an error.
    async fn acknowledge_signal(&self, worker_id: &str, sub_region: &str) -> Result<bool>;

    async fn dataset_by_name(&self, region: &str, name: &str) -> Result<Option<Dataset>>;

    /// Idempotent write keyed by `(region, sub_region, bundle_number, unique_id)`.
    async fn write_processed_record(&self, record: &ProcessedRecord) -> Result<()>;
}
