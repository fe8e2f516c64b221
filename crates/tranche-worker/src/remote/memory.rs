//! In-process remote store
//!
//! Behaves like the server for everything the worker touches, including the
//! administrative overrides, so whole protocols can run without a network.
//! Counters go through the same optimistic transaction as the server's.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tranche_common::codes::canonical_sub_region;
use tranche_common::counter::{self, memory::InMemoryCounterStore, CounterKey, RetryPolicy};
use tranche_common::types::{
    ActiveBundle, ActiveBundles, BundleCounter, Dataset, OverrideSignal, ProcessedRecord,
    SignalKind,
};

use super::{RemoteStore, Signals};
use crate::error::{Result, WorkerError};

type RecordKey = (String, String, u32, String);

#[derive(Debug, Default)]
struct State {
    user_states: HashMap<String, ActiveBundles>,
    signals: HashMap<String, Signals>,
    datasets: Vec<Dataset>,
    records: BTreeMap<RecordKey, ProcessedRecord>,
    force_completed: BTreeSet<(String, String, u32)>,
    failing_records: HashSet<String>,
}

#[derive(Debug, Default)]
pub struct MemoryRemote {
    counters: InMemoryCounterStore,
    policy: RetryPolicy,
    state: Mutex<State>,
    offline: AtomicBool,
    record_writes: AtomicUsize,
}

fn same_sub_region(a: &str, b: &str) -> bool {
    canonical_sub_region(a) == canonical_sub_region(b)
}

fn take_bundle(bundles: &mut ActiveBundles, sub_region: &str) -> Option<ActiveBundle> {
    let key = bundles
        .keys()
        .find(|k| same_sub_region(k, sub_region))
        .cloned()?;
    bundles.remove(&key)
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| WorkerError::remote("memory remote lock poisoned"))
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(WorkerError::remote("remote store is offline"));
        }
        Ok(())
    }

    fn key(region: &str, sub_region: &str) -> CounterKey {
        CounterKey::new(region, sub_region)
    }

    /// Make every call fail with `RemoteUnavailable` until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make writes of the record with `unique_id` fail.
    pub fn fail_record_writes(&self, unique_id: &str) -> Result<()> {
        self.state()?.failing_records.insert(unique_id.to_string());
        Ok(())
    }

    /// Number of processed record writes accepted so far.
    pub fn record_writes(&self) -> usize {
        self.record_writes.load(Ordering::SeqCst)
    }

    pub fn add_dataset(&self, dataset: Dataset) -> Result<()> {
        self.state()?.datasets.push(dataset);
        Ok(())
    }

    pub fn counter(&self, region: &str, sub_region: &str) -> Option<BundleCounter> {
        self.counters.snapshot(&Self::key(region, sub_region))
    }

    pub fn records(&self) -> Result<Vec<ProcessedRecord>> {
        Ok(self.state()?.records.values().cloned().collect())
    }

    pub fn is_force_completed(&self, region: &str, sub_region: &str, bundle_number: u32) -> Result<bool> {
        Ok(self.state()?.force_completed.contains(&(
            region.trim().to_string(),
            canonical_sub_region(sub_region),
            bundle_number,
        )))
    }

    /// Delete the worker's records of its active bundle, drop the bundle,
    /// recycle the number and signal the worker. Returns the bundle number.
    pub async fn reset_progress(&self, region: &str, worker_id: &str, sub_region: &str) -> Result<u32> {
        let bundle_number = {
            let mut state = self.state()?;
            let bundle = state
                .user_states
                .get_mut(worker_id)
                .and_then(|bundles| take_bundle(bundles, sub_region))
                .ok_or_else(|| WorkerError::NoActiveBundle(sub_region.to_string()))?;
            state.records.retain(|(r, s, n, _), record| {
                !(r == region.trim()
                    && same_sub_region(s, sub_region)
                    && *n == bundle.bundle_number
                    && record.processed_by == worker_id)
            });
            state
                .signals
                .entry(worker_id.to_string())
                .or_default()
                .insert(canonical_sub_region(sub_region), OverrideSignal::new(SignalKind::Reset));
            bundle.bundle_number
        };
        counter::recycle_bundle(&self.counters, &Self::key(region, sub_region), bundle_number, &self.policy)
            .await?;
        Ok(bundle_number)
    }

    /// Flag the worker's active bundle complete and drop it. No signal.
    pub fn force_complete(&self, region: &str, worker_id: &str, sub_region: &str) -> Result<u32> {
        let mut state = self.state()?;
        let bundle = state
            .user_states
            .get_mut(worker_id)
            .and_then(|bundles| take_bundle(bundles, sub_region))
            .ok_or_else(|| WorkerError::NoActiveBundle(sub_region.to_string()))?;
        state.force_completed.insert((
            region.trim().to_string(),
            canonical_sub_region(sub_region),
            bundle.bundle_number,
        ));
        Ok(bundle.bundle_number)
    }

    /// Give the worker `bundle_number` directly and signal it.
    ///
    /// The counter is adjusted first. Fails when another worker holds the
    /// bundle.
    pub async fn manual_assign(
        &self,
        region: &str,
        worker_id: &str,
        sub_region: &str,
        bundle_number: u32,
    ) -> Result<ActiveBundle> {
        let key = Self::key(region, sub_region);
        counter::reserve_bundle(&self.counters, &key, bundle_number, &self.policy).await?;

        let bundle = ActiveBundle::new(key.sub_region, bundle_number);
        let mut state = self.state()?;
        let holder = state.user_states.iter().find_map(|(worker, bundles)| {
            let held = bundles.get(&bundle.sub_region)?;
            (worker != worker_id && held.bundle_number == bundle_number).then(|| worker.clone())
        });
        if let Some(holder) = holder {
            return Err(WorkerError::Api {
                code: "CONFLICT".into(),
                message: format!(
                    "Bundle {} of '{}' is active for worker '{}'",
                    bundle_number, bundle.sub_region, holder
                ),
            });
        }

        state
            .user_states
            .entry(worker_id.to_string())
            .or_default()
            .insert(bundle.sub_region.clone(), bundle.clone());
        state.signals.entry(worker_id.to_string()).or_default().insert(
            bundle.sub_region.clone(),
            OverrideSignal::new(SignalKind::ManualAssign { bundle_number }),
        );
        Ok(bundle)
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn allocate_bundle(&self, region: &str, sub_region: &str) -> Result<u32> {
        self.check_online()?;
        Ok(counter::allocate_bundle(&self.counters, &Self::key(region, sub_region), &self.policy).await?)
    }

    async fn recycle_bundle(&self, region: &str, sub_region: &str, bundle_number: u32) -> Result<bool> {
        self.check_online()?;
        Ok(counter::recycle_bundle(
            &self.counters,
            &Self::key(region, sub_region),
            bundle_number,
            &self.policy,
        )
        .await?)
    }

    async fn active_bundles(&self, worker_id: &str) -> Result<ActiveBundles> {
        self.check_online()?;
        Ok(self.state()?.user_states.get(worker_id).cloned().unwrap_or_default())
    }

    async fn put_active_bundle(&self, worker_id: &str, bundle: &ActiveBundle) -> Result<()> {
        self.check_online()?;
        let sub_region = canonical_sub_region(&bundle.sub_region);
        let stored = ActiveBundle {
            sub_region: sub_region.clone(),
            ..bundle.clone()
        };
        self.state()?
            .user_states
            .entry(worker_id.to_string())
            .or_default()
            .insert(sub_region, stored);
        Ok(())
    }

    async fn update_bundle_count(&self, worker_id: &str, bundle: &ActiveBundle) -> Result<bool> {
        self.check_online()?;
        let mut state = self.state()?;
        let held = state
            .user_states
            .get_mut(worker_id)
            .and_then(|bundles| bundles.get_mut(&canonical_sub_region(&bundle.sub_region)))
            .filter(|held| held.bundle_number == bundle.bundle_number);
        match held {
            Some(held) => {
                held.count = held.count.max(bundle.count);
                Ok(true)
            },
            None => Ok(false),
        }
    }

    async fn remove_active_bundle(&self, worker_id: &str, sub_region: &str) -> Result<bool> {
        self.check_online()?;
        Ok(self
            .state()?
            .user_states
            .get_mut(worker_id)
            .and_then(|bundles| take_bundle(bundles, sub_region))
            .is_some())
    }

    async fn clear_user_state(&self, worker_id: &str) -> Result<u64> {
        self.check_online()?;
        Ok(self
            .state()?
            .user_states
            .remove(worker_id)
            .map_or(0, |bundles| bundles.len() as u64))
    }

    async fn signals(&self, worker_id: &str) -> Result<Signals> {
        self.check_online()?;
        Ok(self.state()?.signals.get(worker_id).cloned().unwrap_or_default())
    }

    async fn acknowledge_signal(&self, worker_id: &str, sub_region: &str) -> Result<bool> {
        self.check_online()?;
        let mut state = self.state()?;
        let Some(signals) = state.signals.get_mut(worker_id) else {
            return Ok(false);
        };
        let key = signals.keys().find(|k| same_sub_region(k, sub_region)).cloned();
        Ok(key.and_then(|k| signals.remove(&k)).is_some())
    }

    async fn dataset_by_name(&self, region: &str, name: &str) -> Result<Option<Dataset>> {
        self.check_online()?;
        Ok(self
            .state()?
            .datasets
            .iter()
            .find(|d| d.summary.region == region.trim() && d.summary.name == name.trim())
            .cloned())
    }

    async fn write_processed_record(&self, record: &ProcessedRecord) -> Result<()> {
        self.check_online()?;
        let mut state = self.state()?;
        if state.failing_records.contains(&record.unique_id) {
            return Err(WorkerError::remote(format!("write of {} rejected", record.unique_id)));
        }
        let key = (
            record.region.trim().to_string(),
            canonical_sub_region(&record.sub_region),
            record.bundle_number,
            record.unique_id.clone(),
        );
        state.records.insert(key, record.clone());
        self.record_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
