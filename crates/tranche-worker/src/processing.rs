//! Record lookup and processing
//!
//! Processing moves a cached record from pending to processed, stamping it
//! with the next unique id of its sub-region's active bundle.

use serde::Serialize;
use tranche_common::codes;
use tranche_common::fields::{self, PDF_REQUIRED_FIELD};
use tranche_common::types::RecordStatus;
use tracing::warn;

use crate::cache::{CacheEntry, CommittedRecord, LocalCache};
use crate::error::{Result, WorkerError};
use crate::overrides;
use crate::remote::RemoteStore;
use crate::session::Session;

/// A pending record ready to be processed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupResult {
    pub entry: CacheEntry,
    /// Value of the `pdf required` column, if the dataset has one.
    pub pdf_required: Option<String>,
    /// Id the record would get if processed now; `None` while it cannot be.
    pub next_unique_id: Option<String>,
}

/// Find a pending record of the synced dataset.
pub async fn find_pending(cache: &LocalCache, record_id: &str) -> Result<CacheEntry> {
    let state = cache.sync_state().await?.ok_or_else(|| {
        WorkerError::NoRecords("the local cache is empty, run 'tranche sync-in' first".into())
    })?;
    let entry = cache
        .find_entry(&state.dataset_id, record_id)
        .await?
        .ok_or_else(|| WorkerError::RecordNotFound(record_id.trim().to_string()))?;

    if entry.status != RecordStatus::Pending {
        return Err(WorkerError::AlreadyProcessed {
            record_id: entry.record_id,
            unique_id: entry.unique_id.unwrap_or_default(),
        });
    }
    Ok(entry)
}

/// The id the next commit of `entry` would produce. Changes nothing.
pub async fn preview_unique_id(cache: &LocalCache, session: &Session, entry: &CacheEntry) -> Result<String> {
    let sub_region = entry
        .sub_region
        .as_deref()
        .ok_or_else(|| WorkerError::MissingSubRegion(entry.record_id.clone()))?;
    let bundle = cache
        .active_bundle(sub_region)
        .await?
        .ok_or_else(|| WorkerError::NoActiveBundle(sub_region.to_string()))?;
    if bundle.is_full() {
        return Err(WorkerError::BundleFull {
            sub_region: bundle.sub_region,
            bundle_number: bundle.bundle_number,
        });
    }
    Ok(codes::unique_id(&session.region, &bundle))
}

pub async fn lookup(cache: &LocalCache, session: &Session, record_id: &str) -> Result<LookupResult> {
    let entry = find_pending(cache, record_id).await?;
    let next_unique_id = match preview_unique_id(cache, session, &entry).await {
        Ok(id) => Some(id),
        Err(e) if e.is_precondition() || matches!(e, WorkerError::MissingSubRegion(_)) => None,
        Err(e) => return Err(e),
    };
    Ok(LookupResult {
        pdf_required: fields::field_as_string(&entry.fields, PDF_REQUIRED_FIELD),
        entry,
        next_unique_id,
    })
}

/// Commit a pending record and publish the new bundle count.
///
/// Overrides are applied first when the remote is reachable, so a bundle an
/// administrator reset or force-completed is never committed into. Offline,
/// the local bundle map is used as is. The count update only lands while the
/// server still has this bundle for the worker; a refused update means an
/// override raced the commit and is reconciled straight away.
#[tracing::instrument(skip(cache, remote, session), fields(worker = %session.worker_id))]
pub async fn process<R>(
    cache: &LocalCache,
    remote: &R,
    session: &Session,
    record_id: &str,
) -> Result<CommittedRecord>
where
    R: RemoteStore + ?Sized,
{
    let entry = find_pending(cache, record_id).await?;
    overrides::catch_up(cache, remote, session).await;

    let committed = cache
        .commit_processed(entry.id, &session.worker_id, &session.region)
        .await?;

    match remote.update_bundle_count(&session.worker_id, &committed.bundle).await {
        Ok(true) => {},
        Ok(false) => {
            warn!(
                sub_region = %committed.bundle.sub_region,
                bundle = committed.bundle.bundle_number,
                "Bundle was withdrawn remotely during the commit"
            );
            overrides::catch_up(cache, remote, session).await;
        },
        Err(e) => warn!(
            error = %e,
            sub_region = %committed.bundle.sub_region,
            count = committed.bundle.count,
            "Bundle count not published"
        ),
    }
    Ok(committed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cache::SyncState;
    use crate::remote::MemoryRemote;
    use chrono::Utc;
    use serde_json::json;
    use tranche_common::types::{ActiveBundle, FieldMap, SourceRow};

    async fn seeded_cache() -> LocalCache {
        let cache = LocalCache::in_memory().await.unwrap();
        let mut fields = FieldMap::new();
        fields.insert("Search from".into(), json!("R-001"));
        fields.insert("Taluka".into(), json!("Paithan"));
        fields.insert("PDF Required ".into(), json!("Yes"));
        let row = SourceRow::from_fields(fields, "Search from").unwrap();
        cache.insert_rows("d1", "survey.csv", &[row]).await.unwrap();
        cache
            .set_sync_state(&SyncState {
                dataset_id: "d1".into(),
                dataset_name: "survey.csv".into(),
                region: "chhatrapati-sambhajinagar".into(),
                row_count: 1,
                synced_at: Utc::now(),
            })
            .await
            .unwrap();
        cache
    }

    fn session() -> Session {
        Session::new("w1", "chhatrapati-sambhajinagar", "survey.csv")
    }

    #[tokio::test]
    async fn test_lookup_previews_without_mutating() {
        let cache = seeded_cache().await;
        let found = lookup(&cache, &session(), "R-001").await.unwrap();
        assert_eq!(found.pdf_required.as_deref(), Some("Yes"));
        assert!(found.next_unique_id.is_none());

        cache.put_active_bundle(&ActiveBundle::new("Paithan", 2)).await.unwrap();
        let found = lookup(&cache, &session(), " R-001 ").await.unwrap();
        assert_eq!(found.next_unique_id.as_deref(), Some("CSPA250"));
        assert_eq!(cache.active_bundle("Paithan").await.unwrap().unwrap().count, 0);
    }

    #[tokio::test]
    async fn test_process_publishes_count_and_blocks_reprocessing() {
        let cache = seeded_cache().await;
        let remote = MemoryRemote::new();
        let bundle = ActiveBundle::new("Paithan", 1);
        cache.put_active_bundle(&bundle).await.unwrap();
        remote.put_active_bundle("w1", &bundle).await.unwrap();

        let committed = process(&cache, &remote, &session(), "R-001").await.unwrap();
        assert_eq!(committed.entry.unique_id.as_deref(), Some("CSPA0"));
        assert_eq!(remote.active_bundles("w1").await.unwrap()["Paithan"].count, 1);

        let err = lookup(&cache, &session(), "R-001").await.unwrap_err();
        assert!(matches!(err, WorkerError::AlreadyProcessed { .. }));
    }

    #[tokio::test]
    async fn test_process_survives_offline_remote() {
        let cache = seeded_cache().await;
        let remote = MemoryRemote::new();
        remote.set_offline(true);
        cache.put_active_bundle(&ActiveBundle::new("Paithan", 1)).await.unwrap();

        let committed = process(&cache, &remote, &session(), "R-001").await.unwrap();
        assert_eq!(committed.bundle.count, 1);
    }

    #[tokio::test]
    async fn test_process_refuses_bundle_withdrawn_remotely() {
        let cache = seeded_cache().await;
        let remote = MemoryRemote::new();
        cache.put_active_bundle(&ActiveBundle::new("Paithan", 1)).await.unwrap();

        let err = process(&cache, &remote, &session(), "R-001").await.unwrap_err();
        assert!(matches!(err, WorkerError::NoActiveBundle(_)));
        assert!(remote.active_bundles("w1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_record() {
        let cache = seeded_cache().await;
        let err = lookup(&cache, &session(), "R-404").await.unwrap_err();
        assert!(matches!(err, WorkerError::RecordNotFound(_)));
    }
}
