//! Worker protocols run end to end against an in-process remote store
//!
//! These tests cover:
//! - Concurrent bundle allocation and gap recycling
//! - A full bundle from request through sync-out
//! - Administrator resets and manual assignment
//! - Sync-in and sync-out idempotence

#![allow(clippy::unwrap_used)]

use chrono::Utc;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use tranche_common::types::{ActiveBundle, Dataset, DatasetSummary, FieldMap, RecordStatus, SignalKind};
use tranche_common::BUNDLE_CAPACITY;
use tranche_worker::allocation::request_bundle;
use tranche_worker::cache::LocalCache;
use tranche_worker::progress::NoProgress;
use tranche_worker::remote::{MemoryRemote, RemoteStore};
use tranche_worker::sync::{sync_in, sync_out};
use tranche_worker::{maintenance, overrides, processing, Session, WorkerError};

const REGION: &str = "chhatrapati-sambhajinagar";
const DATASET: &str = "survey.csv";

fn session() -> Session {
    session_of("w1")
}

fn session_of(worker_id: &str) -> Session {
    Session::new(worker_id, REGION, DATASET)
}

fn row(record_id: &str, taluka: &str) -> FieldMap {
    let mut fields = FieldMap::new();
    fields.insert("Search from".into(), json!(record_id));
    fields.insert("Taluka".into(), json!(taluka));
    fields.insert("Village".into(), json!("Bidkin"));
    fields
}

fn dataset(rows: Vec<FieldMap>) -> Dataset {
    Dataset {
        summary: DatasetSummary {
            id: "ds-1".into(),
            region: REGION.into(),
            name: DATASET.into(),
            size_bytes: 1024,
            record_count: rows.len() as i64,
            uploaded_at: Utc::now(),
        },
        rows,
    }
}

/// A remote holding `count` Paithan rows and a cache synced from it.
async fn synced(count: usize) -> (LocalCache, MemoryRemote) {
    let remote = MemoryRemote::new();
    let rows = (1..=count).map(|i| row(&format!("R-{i:04}"), "Paithan")).collect();
    remote.add_dataset(dataset(rows)).unwrap();

    let cache = LocalCache::in_memory().await.unwrap();
    let report = sync_in(&cache, &remote, &session(), &NoProgress).await.unwrap();
    assert_eq!(report.inserted, count as u64);
    (cache, remote)
}

/// A second worker's cache, synced from the same remote.
async fn second_worker(remote: &MemoryRemote) -> LocalCache {
    let cache = LocalCache::in_memory().await.unwrap();
    sync_in(&cache, remote, &session_of("w2"), &NoProgress).await.unwrap();
    cache
}

async fn process_as(cache: &LocalCache, remote: &MemoryRemote, worker_id: &str, i: usize) -> Result<String, WorkerError> {
    let committed = processing::process(cache, remote, &session_of(worker_id), &format!("R-{i:04}")).await?;
    Ok(committed.entry.unique_id.unwrap())
}

async fn process_range(cache: &LocalCache, remote: &MemoryRemote, range: std::ops::RangeInclusive<usize>) -> Vec<String> {
    let mut ids = Vec::new();
    for i in range {
        let committed = processing::process(cache, remote, &session(), &format!("R-{i:04}"))
            .await
            .unwrap();
        ids.push(committed.entry.unique_id.unwrap());
    }
    ids
}

// ============================================================================
// Counter Service
// ============================================================================

#[tokio::test]
async fn test_concurrent_allocations_are_distinct() {
    let remote = Arc::new(MemoryRemote::new());

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let remote = Arc::clone(&remote);
            tokio::spawn(async move { remote.allocate_bundle(REGION, "Kannad").await })
        })
        .collect();

    let mut numbers = BTreeSet::new();
    for handle in handles {
        assert!(numbers.insert(handle.await.unwrap().unwrap()));
    }
    assert_eq!(numbers, (1..=20).collect());
    assert_eq!(remote.counter(REGION, "Kannad").unwrap().next_bundle_number, 21);
}

#[tokio::test]
async fn test_recycled_number_is_reused_first() {
    let remote = MemoryRemote::new();
    for expected in 1..=3 {
        assert_eq!(remote.allocate_bundle(REGION, "Sillod").await.unwrap(), expected);
    }

    assert!(remote.recycle_bundle(REGION, "Sillod", 2).await.unwrap());
    assert_eq!(remote.allocate_bundle(REGION, "Sillod").await.unwrap(), 2);
    assert_eq!(remote.allocate_bundle(REGION, "Sillod").await.unwrap(), 4);
}

#[tokio::test]
async fn test_sub_regions_count_independently() {
    let remote = MemoryRemote::new();
    assert_eq!(remote.allocate_bundle(REGION, "Sillod").await.unwrap(), 1);
    assert_eq!(remote.allocate_bundle(REGION, "Sillod").await.unwrap(), 2);
    assert_eq!(remote.allocate_bundle(REGION, "Paithan").await.unwrap(), 1);
    assert_eq!(remote.allocate_bundle("ahilyanagar", "Sillod").await.unwrap(), 1);
}

// ============================================================================
// Bundle Lifecycle
// ============================================================================

#[tokio::test]
async fn test_full_bundle_lifecycle() {
    let total = BUNDLE_CAPACITY as usize + 1;
    let (cache, remote) = synced(total).await;

    let bundle = request_bundle(&cache, &remote, &session(), "Paithan").await.unwrap();
    assert_eq!(bundle, ActiveBundle::new("Paithan", 1));

    let ids = process_range(&cache, &remote, 1..=BUNDLE_CAPACITY as usize).await;
    assert_eq!(ids.first().unwrap(), "CSPA0");
    assert_eq!(ids.last().unwrap(), "CSPA249");
    assert_eq!(ids.iter().collect::<BTreeSet<_>>().len(), ids.len());

    // The bundle is full: one more record cannot be processed.
    let err = processing::process(&cache, &remote, &session(), &format!("R-{total:04}"))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkerError::BundleFull { bundle_number: 1, .. }));

    // A full bundle with unsynced records blocks the next request.
    let err = request_bundle(&cache, &remote, &session(), "Paithan").await.unwrap_err();
    assert!(matches!(err, WorkerError::SyncRequired { unsynced: 250, .. }));

    let report = sync_out(&cache, &remote, &session(), &NoProgress).await.unwrap();
    assert_eq!(report.synced, u64::from(BUNDLE_CAPACITY));
    assert_eq!(report.failed, 0);
    assert_eq!(report.completed_bundles.len(), 1);
    assert!(cache.active_bundle("Paithan").await.unwrap().is_none());
    assert!(remote.active_bundles("w1").await.unwrap().is_empty());
    assert_eq!(remote.records().unwrap().len(), BUNDLE_CAPACITY as usize);

    let next = request_bundle(&cache, &remote, &session(), "Paithan").await.unwrap();
    assert_eq!(next.bundle_number, 2);
    let ids = process_range(&cache, &remote, total..=total).await;
    assert_eq!(ids, vec!["CSPA250".to_string()]);
}

#[tokio::test]
async fn test_remote_count_follows_local_commits() {
    let (cache, remote) = synced(5).await;
    request_bundle(&cache, &remote, &session(), "Paithan").await.unwrap();
    process_range(&cache, &remote, 1..=3).await;

    let remote_bundle = remote.active_bundles("w1").await.unwrap()["Paithan"].clone();
    assert_eq!(remote_bundle.count, 3);
    assert_eq!(cache.active_bundle("Paithan").await.unwrap().unwrap().count, 3);
}

#[tokio::test]
async fn test_processing_works_offline() {
    let (cache, remote) = synced(4).await;
    request_bundle(&cache, &remote, &session(), "Paithan").await.unwrap();
    remote.set_offline(true);

    let ids = process_range(&cache, &remote, 1..=2).await;
    assert_eq!(ids, vec!["CSPA0".to_string(), "CSPA1".to_string()]);

    let offline = sync_out(&cache, &remote, &session(), &NoProgress).await.unwrap();
    assert_eq!(offline.failed, 2);
    remote.set_offline(false);
    let report = sync_out(&cache, &remote, &session(), &NoProgress).await.unwrap();
    assert_eq!(report.synced, 2);
}

// ============================================================================
// Administrator Overrides
// ============================================================================

#[tokio::test]
async fn test_reset_returns_number_for_reuse() {
    let (cache, remote) = synced(20).await;
    remote.allocate_bundle(REGION, "Paithan").await.unwrap();
    remote.allocate_bundle(REGION, "Paithan").await.unwrap();

    let bundle = request_bundle(&cache, &remote, &session(), "Paithan").await.unwrap();
    assert_eq!(bundle.bundle_number, 3);
    let ids = process_range(&cache, &remote, 1..=10).await;
    assert_eq!(ids[0], "CSPA500");

    assert_eq!(remote.reset_progress(REGION, "w1", "Paithan").await.unwrap(), 3);

    let handled = overrides::poll_once(&cache, &remote, &session()).await.unwrap();
    assert_eq!(handled.len(), 1);
    assert_eq!(handled[0].kind, SignalKind::Reset);
    assert_eq!(handled[0].reverted_entries, 10);
    assert!(handled[0].acknowledged);
    assert!(cache.active_bundle("Paithan").await.unwrap().is_none());
    assert!(remote.signals("w1").await.unwrap().is_empty());
    assert_eq!(cache.status_counts().await.unwrap().pending, 20);

    let again = request_bundle(&cache, &remote, &session(), "Paithan").await.unwrap();
    assert_eq!(again.bundle_number, 3);
    let ids = process_range(&cache, &remote, 1..=1).await;
    assert_eq!(ids, vec!["CSPA500".to_string()]);
}

#[tokio::test]
async fn test_redelivered_reset_is_harmless() {
    let (cache, remote) = synced(3).await;
    request_bundle(&cache, &remote, &session(), "Paithan").await.unwrap();
    process_range(&cache, &remote, 1..=2).await;
    remote.reset_progress(REGION, "w1", "Paithan").await.unwrap();

    let first = overrides::poll_once(&cache, &remote, &session()).await.unwrap();
    assert_eq!(first[0].reverted_entries, 2);

    // Same signal again, as if the acknowledgement had been lost.
    let signal = tranche_common::types::OverrideSignal::new(SignalKind::Reset);
    let reverted = overrides::apply_signal(&cache, &remote, &session(), "Paithan", &signal)
        .await
        .unwrap();
    assert_eq!(reverted, 0);
    assert_eq!(cache.status_counts().await.unwrap().pending, 3);
}

#[tokio::test]
async fn test_manual_assign_reaches_worker() {
    let (cache, remote) = synced(3).await;
    remote.manual_assign(REGION, "w1", "Paithan", 7).await.unwrap();

    let handled = overrides::poll_once(&cache, &remote, &session()).await.unwrap();
    assert_eq!(handled[0].kind, SignalKind::ManualAssign { bundle_number: 7 });
    assert_eq!(cache.active_bundle("Paithan").await.unwrap().unwrap().bundle_number, 7);

    let ids = process_range(&cache, &remote, 1..=1).await;
    assert_eq!(ids, vec!["CSPA1500".to_string()]);
}

#[tokio::test]
async fn test_reset_reaches_worker_that_is_not_watching() {
    let (cache, remote) = synced(4).await;
    let other = second_worker(&remote).await;

    request_bundle(&cache, &remote, &session(), "Paithan").await.unwrap();
    assert_eq!(process_as(&cache, &remote, "w1", 1).await.unwrap(), "CSPA0");
    remote.reset_progress(REGION, "w1", "Paithan").await.unwrap();

    // The next commit applies the reset instead of reviving bundle 1.
    let err = process_as(&cache, &remote, "w1", 2).await.unwrap_err();
    assert!(matches!(err, WorkerError::NoActiveBundle(_)));
    assert!(remote.active_bundles("w1").await.unwrap().is_empty());
    assert!(remote.signals("w1").await.unwrap().is_empty());
    assert_eq!(cache.status_counts().await.unwrap().pending, 4);

    let theirs = request_bundle(&other, &remote, &session_of("w2"), "Paithan").await.unwrap();
    assert_eq!(theirs.bundle_number, 1);
    let mine = request_bundle(&cache, &remote, &session(), "Paithan").await.unwrap();
    assert_eq!(mine.bundle_number, 2);

    let mut ids = BTreeSet::new();
    for i in 1..=2 {
        assert!(ids.insert(process_as(&other, &remote, "w2", i).await.unwrap()));
        assert!(ids.insert(process_as(&cache, &remote, "w1", i + 2).await.unwrap()));
    }
    assert_eq!(
        ids,
        ["CSPA0", "CSPA1", "CSPA250", "CSPA251"].into_iter().map(String::from).collect()
    );
}

#[tokio::test]
async fn test_force_complete_reaches_worker_that_is_not_watching() {
    let (cache, remote) = synced(4).await;
    request_bundle(&cache, &remote, &session(), "Paithan").await.unwrap();
    process_range(&cache, &remote, 1..=2).await;

    assert_eq!(remote.force_complete(REGION, "w1", "Paithan").unwrap(), 1);

    let err = process_as(&cache, &remote, "w1", 3).await.unwrap_err();
    assert!(matches!(err, WorkerError::NoActiveBundle(_)));
    assert!(remote.active_bundles("w1").await.unwrap().is_empty());

    let next = request_bundle(&cache, &remote, &session(), "Paithan").await.unwrap();
    assert_eq!(next.bundle_number, 2);

    // Records of the force-completed bundle still reach the server under it.
    let report = sync_out(&cache, &remote, &session(), &NoProgress).await.unwrap();
    assert_eq!(report.synced, 2);
    assert_eq!(report.skipped_no_active_bundle, 0);
    assert!(remote.records().unwrap().iter().all(|r| r.bundle_number == 1));
    assert!(remote.is_force_completed(REGION, "Paithan", 1).unwrap());
}

#[tokio::test]
async fn test_sub_region_spelling_shares_one_sequence() {
    let (cache, remote) = synced(2).await;
    let other = second_worker(&remote).await;

    let mine = request_bundle(&cache, &remote, &session(), "Paithan").await.unwrap();
    let theirs = request_bundle(&other, &remote, &session_of("w2"), "paithan").await.unwrap();
    assert_eq!((mine.bundle_number, theirs.bundle_number), (1, 2));
    assert_eq!(theirs.sub_region, "Paithan");

    assert_eq!(process_as(&cache, &remote, "w1", 1).await.unwrap(), "CSPA0");
    assert_eq!(process_as(&other, &remote, "w2", 1).await.unwrap(), "CSPA250");
    assert_eq!(remote.active_bundles("w2").await.unwrap()["Paithan"].count, 1);
}

#[tokio::test]
async fn test_unreachable_remote_leaves_signals_pending() {
    let (cache, remote) = synced(2).await;
    request_bundle(&cache, &remote, &session(), "Paithan").await.unwrap();
    remote.reset_progress(REGION, "w1", "Paithan").await.unwrap();

    remote.set_offline(true);
    assert!(overrides::poll_once(&cache, &remote, &session()).await.is_err());
    remote.set_offline(false);
    assert_eq!(remote.signals("w1").await.unwrap().len(), 1);
}

// ============================================================================
// Sync Idempotence
// ============================================================================

#[tokio::test]
async fn test_second_sync_out_writes_nothing() {
    let (cache, remote) = synced(6).await;
    request_bundle(&cache, &remote, &session(), "Paithan").await.unwrap();
    process_range(&cache, &remote, 1..=5).await;

    let first = sync_out(&cache, &remote, &session(), &NoProgress).await.unwrap();
    assert_eq!(first.synced, 5);
    assert!(first.completed_bundles.is_empty());
    assert_eq!(remote.record_writes(), 5);

    let second = sync_out(&cache, &remote, &session(), &NoProgress).await.unwrap();
    assert_eq!(second.total, 0);
    assert_eq!(remote.record_writes(), 5);
    assert_eq!(cache.status_counts().await.unwrap().synced, 5);
}

#[tokio::test]
async fn test_failed_write_does_not_stop_batch() {
    let (cache, remote) = synced(3).await;
    request_bundle(&cache, &remote, &session(), "Paithan").await.unwrap();
    let ids = process_range(&cache, &remote, 1..=3).await;
    remote.fail_record_writes(&ids[1]).unwrap();

    let report = sync_out(&cache, &remote, &session(), &NoProgress).await.unwrap();
    assert_eq!(report.synced, 2);
    assert_eq!(report.failed, 1);

    let still_processed = cache.entries_with_status(RecordStatus::Processed).await.unwrap();
    assert_eq!(still_processed.len(), 1);
    assert_eq!(still_processed[0].unique_id.as_deref(), Some(ids[1].as_str()));
}

#[tokio::test]
async fn test_sync_in_twice_keeps_progress() {
    let (cache, remote) = synced(4).await;
    request_bundle(&cache, &remote, &session(), "Paithan").await.unwrap();
    process_range(&cache, &remote, 1..=2).await;

    let report = sync_in(&cache, &remote, &session(), &NoProgress).await.unwrap();
    assert_eq!(report.inserted, 0);
    assert_eq!(report.duplicates, 4);

    let counts = cache.status_counts().await.unwrap();
    assert_eq!(counts.total(), 4);
    assert_eq!(counts.processed, 2);
}

#[tokio::test]
async fn test_sync_in_counts_rows_without_record_id() {
    let remote = MemoryRemote::new();
    let mut rows = vec![row("R-0001", "Paithan"), row("R-0002", "Kannad")];
    rows.push(row("  ", "Paithan"));
    remote.add_dataset(dataset(rows)).unwrap();
    let cache = LocalCache::in_memory().await.unwrap();

    let report = sync_in(&cache, &remote, &session(), &NoProgress).await.unwrap();
    assert_eq!(report.total_rows, 3);
    assert_eq!(report.inserted, 2);
    assert_eq!(report.missing_record_id, 1);
}

#[tokio::test]
async fn test_sync_in_unknown_dataset() {
    let remote = MemoryRemote::new();
    let cache = LocalCache::in_memory().await.unwrap();
    let err = sync_in(&cache, &remote, &session(), &NoProgress).await.unwrap_err();
    assert!(matches!(err, WorkerError::DatasetNotFound { .. }));
    assert!(cache.sync_state().await.unwrap().is_none());
}

// ============================================================================
// Maintenance
// ============================================================================

#[tokio::test]
async fn test_purge_needs_the_remote() {
    let (cache, remote) = synced(2).await;
    request_bundle(&cache, &remote, &session(), "Paithan").await.unwrap();
    let digest = tranche_common::auth::hash_password("s3cret");

    remote.set_offline(true);
    let err = maintenance::purge(&cache, &remote, &session(), "s3cret", Some(&digest))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkerError::RemoteUnavailable(_)));
    assert_eq!(cache.status_counts().await.unwrap().total(), 2);

    remote.set_offline(false);
    let report = maintenance::purge(&cache, &remote, &session(), "s3cret", Some(&digest))
        .await
        .unwrap();
    assert_eq!(report.entries, 2);
    assert_eq!(report.active_bundles, 1);
    assert!(remote.active_bundles("w1").await.unwrap().is_empty());
}
