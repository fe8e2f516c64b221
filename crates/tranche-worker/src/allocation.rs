//! Bundle allocation protocol
//!
//! A worker asks for a new bundle of a sub-region only when it holds none.
//! Pending overrides are applied first when the remote is reachable; the
//! preconditions are then checked against the local cache, so a refused
//! request never writes anything remotely.

use tranche_common::codes;
use tranche_common::types::ActiveBundle;
use tracing::{info, warn};

use crate::cache::LocalCache;
use crate::error::{Result, WorkerError};
use crate::overrides;
use crate::remote::RemoteStore;
use crate::session::Session;

/// Refuse a new bundle while one is still held for `sub_region`.
pub async fn check_preconditions(cache: &LocalCache, sub_region: &str) -> Result<()> {
    let Some(existing) = cache.active_bundle(sub_region).await? else {
        return Ok(());
    };

    if !existing.is_full() {
        return Err(WorkerError::BundleInProgress {
            sub_region: existing.sub_region,
            bundle_number: existing.bundle_number,
            count: existing.count,
        });
    }

    let unsynced = cache.count_unsynced(sub_region).await?;
    if unsynced > 0 {
        return Err(WorkerError::SyncRequired {
            sub_region: existing.sub_region,
            bundle_number: existing.bundle_number,
            unsynced,
        });
    }

    Err(WorkerError::BundleAlreadyActive {
        sub_region: existing.sub_region,
        bundle_number: existing.bundle_number,
    })
}

/// Allocate the next bundle of `sub_region` and record it remotely, then
/// locally.
///
/// The sub-region is stored in its canonical spelling. If the remote record
/// cannot be written the number goes back to the gap pool and nothing is kept
/// locally, so the worker never holds a bundle the server does not know of.
#[tracing::instrument(skip(cache, remote, session), fields(worker = %session.worker_id))]
pub async fn request_bundle<R>(
    cache: &LocalCache,
    remote: &R,
    session: &Session,
    sub_region: &str,
) -> Result<ActiveBundle>
where
    R: RemoteStore + ?Sized,
{
    let sub_region = codes::canonical_sub_region(sub_region);
    if sub_region.is_empty() {
        return Err(WorkerError::config("sub-region must not be empty"));
    }
    codes::check_sub_region_code(&sub_region)?;

    overrides::catch_up(cache, remote, session).await;
    check_preconditions(cache, &sub_region).await?;

    let bundle_number = remote.allocate_bundle(&session.region, &sub_region).await?;
    let bundle = ActiveBundle::new(sub_region.as_str(), bundle_number);

    if let Err(e) = remote.put_active_bundle(&session.worker_id, &bundle).await {
        warn!(error = %e, %sub_region, bundle_number, "Bundle not recorded remotely, returning it");
        if let Err(recycle) = remote
            .recycle_bundle(&session.region, &sub_region, bundle_number)
            .await
        {
            warn!(error = %recycle, %sub_region, bundle_number, "Bundle number could not be returned");
        }
        return Err(e);
    }
    cache.put_active_bundle(&bundle).await?;

    info!(%sub_region, bundle_number, "Bundle allocated");
    Ok(bundle)
}
