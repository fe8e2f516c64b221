use chrono::Utc;
use serde::Serialize;
use tranche_common::{codes, fields};
use tranche_common::types::{ActiveBundle, ActiveBundles, ProcessedRecord, RecordStatus};
use tracing::{info, warn};

use crate::cache::{CacheEntry, LocalCache};
use crate::error::Result;
use crate::overrides;
use crate::progress::ProgressReporter;
use crate::remote::RemoteStore;
use crate::session::Session;

/// Records pushed between cooperative yields.
const YIELD_EVERY: usize = 50;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncOutReport {
    pub total: u64,
    pub synced: u64,
    pub skipped_missing_sub_region: u64,
    pub skipped_no_active_bundle: u64,
    pub failed: u64,
    /// Full bundles released after every record reached the server.
    pub completed_bundles: Vec<ActiveBundle>,
}

enum Outcome {
    Synced,
    MissingSubRegion,
    NoActiveBundle,
    Failed,
}

fn find_bundle<'a>(bundles: &'a ActiveBundles, sub_region: &str) -> Option<&'a ActiveBundle> {
    bundles
        .values()
        .find(|b| b.sub_region.trim().eq_ignore_ascii_case(sub_region.trim()))
}

async fn push_entry<R>(
    cache: &LocalCache,
    remote: &R,
    session: &Session,
    entry: &CacheEntry,
) -> Result<Outcome>
where
    R: RemoteStore + ?Sized,
{
    let Some(sub_region) = entry
        .sub_region
        .clone()
        .or_else(|| fields::sub_region_of(&entry.fields))
    else {
        warn!(record_id = %entry.record_id, "Skipping record without a sub-region");
        return Ok(Outcome::MissingSubRegion);
    };

    // Entries carry the bundle they were committed into; the active bundle
    // only fills in for entries that lack one. Overrides can change the map
    // at any time, so it is read per record.
    let bundle_number = match entry.bundle_number {
        Some(n) => n,
        None => {
            let bundles = cache.active_bundles().await?;
            let Some(active) = find_bundle(&bundles, &sub_region) else {
                warn!(record_id = %entry.record_id, %sub_region, "Skipping record without an active bundle");
                return Ok(Outcome::NoActiveBundle);
            };
            active.bundle_number
        },
    };

    let Some(unique_id) = entry.unique_id.clone() else {
        warn!(record_id = %entry.record_id, "Processed record has no unique id");
        return Ok(Outcome::Failed);
    };

    let record = ProcessedRecord {
        region: session.region.clone(),
        sub_region: codes::canonical_sub_region(&sub_region),
        bundle_number,
        unique_id,
        fields: entry.fields.clone(),
        processed_by: entry
            .processed_by
            .clone()
            .unwrap_or_else(|| session.worker_id.clone()),
        processed_at: entry.processed_at.unwrap_or_else(Utc::now),
        source_dataset_name: entry.source_dataset_name.clone(),
    };

    if let Err(e) = remote.write_processed_record(&record).await {
        warn!(error = %e, unique_id = %record.unique_id, "Record not synced");
        return Ok(Outcome::Failed);
    }
    cache.mark_synced(entry.id).await?;
    Ok(Outcome::Synced)
}

/// Push every processed entry to the remote store, one at a time.
///
/// Pending overrides are applied first when the remote is reachable, so
/// records of a reset bundle go back to pending instead of being written. An
/// entry becomes synced only after its own remote write succeeded. Skips and
/// failures are counted and do not stop the batch; running this again
/// retries exactly the entries that are still processed.
#[tracing::instrument(skip(cache, remote, session, progress), fields(worker = %session.worker_id))]
pub async fn sync_out<R>(
    cache: &LocalCache,
    remote: &R,
    session: &Session,
    progress: &dyn ProgressReporter,
) -> Result<SyncOutReport>
where
    R: RemoteStore + ?Sized,
{
    overrides::catch_up(cache, remote, session).await;

    let entries = cache.entries_with_status(RecordStatus::Processed).await?;
    let mut report = SyncOutReport {
        total: entries.len() as u64,
        ..Default::default()
    };
    progress.start(report.total, "Syncing records");

    for (i, entry) in entries.iter().enumerate() {
        match push_entry(cache, remote, session, entry).await? {
            Outcome::Synced => report.synced += 1,
            Outcome::MissingSubRegion => report.skipped_missing_sub_region += 1,
            Outcome::NoActiveBundle => report.skipped_no_active_bundle += 1,
            Outcome::Failed => report.failed += 1,
        }
        progress.advance(1);
        if (i + 1) % YIELD_EVERY == 0 {
            tokio::task::yield_now().await;
        }
    }

    report.completed_bundles = complete_full_bundles(cache, remote, session).await?;
    progress.finish("Sync complete");
    info!(
        synced = report.synced,
        failed = report.failed,
        completed = report.completed_bundles.len(),
        "Sync-out finished"
    );
    Ok(report)
}

/// Release every full bundle whose records are all synced: remotely first,
/// then locally once the server confirmed.
pub async fn complete_full_bundles<R>(
    cache: &LocalCache,
    remote: &R,
    session: &Session,
) -> Result<Vec<ActiveBundle>>
where
    R: RemoteStore + ?Sized,
{
    let mut completed = Vec::new();
    for bundle in cache.active_bundles().await?.into_values() {
        if !bundle.is_full() || cache.count_unsynced(&bundle.sub_region).await? > 0 {
            continue;
        }
        match remote
            .remove_active_bundle(&session.worker_id, &bundle.sub_region)
            .await
        {
            Ok(_) => {
                cache.remove_active_bundle(&bundle.sub_region).await?;
                info!(sub_region = %bundle.sub_region, bundle = bundle.bundle_number, "Bundle completed");
                completed.push(bundle);
            },
            Err(e) => {
                warn!(error = %e, sub_region = %bundle.sub_region, "Bundle full but not released remotely")
            },
        }
    }
    Ok(completed)
}
