//! Optimistic bundle counter transaction.
//!
//! A counter is read together with its version, the new value is computed
//! locally, and the write only lands if the version is unchanged. A lost race
//! re-reads and re-applies the update until it commits or the retry budget is
//! exhausted. The server runs this over PostgreSQL, tests over
//! [`memory::InMemoryCounterStore`].

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::codes::canonical_sub_region;
use crate::error::{Result, TrancheError};
use crate::types::BundleCounter;

/// Default number of commit attempts before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 25;

/// Default pause after the first lost race; grows linearly per attempt.
pub const DEFAULT_BACKOFF_MS: u64 = 5;

/// Identifies one counter. The region is trimmed and the sub-region put in
/// its canonical spelling, so differently cased names share a counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CounterKey {
    pub region: String,
    pub sub_region: String,
}

impl CounterKey {
    pub fn new(region: &str, sub_region: &str) -> Self {
        Self {
            region: region.trim().to_string(),
            sub_region: canonical_sub_region(sub_region),
        }
    }
}

impl std::fmt::Display for CounterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.region, self.sub_region)
    }
}

/// A stored value and the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub value: T,
    pub version: i64,
}

/// Storage seam for counters.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn load(&self, key: &CounterKey) -> Result<Option<Versioned<BundleCounter>>>;

    /// Store `next` if the counter is still at `expected_version`
    /// (`None` = the counter must not exist yet). Returns `false` when another
    /// writer got there first.
    async fn compare_and_swap(
        &self,
        key: &CounterKey,
        expected_version: Option<i64>,
        next: &BundleCounter,
    ) -> Result<bool>;
}

/// Retry budget for one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Duration::from_millis(DEFAULT_BACKOFF_MS),
        }
    }
}

/// Outcome of one invocation of a transaction's update function.
#[derive(Debug)]
pub enum Step<T> {
    /// Write this counter value, then return `T`.
    Commit(BundleCounter, T),
    /// Nothing to write, return `T` immediately.
    Abort(T),
}

/// Run `update` against the latest counter value until the write commits.
pub async fn run_transaction<S, F, T>(
    store: &S,
    key: &CounterKey,
    policy: &RetryPolicy,
    mut update: F,
) -> Result<T>
where
    S: CounterStore + ?Sized,
    F: FnMut(Option<BundleCounter>) -> Step<T> + Send,
    T: Send,
{
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        let current = store.load(key).await?;
        let expected_version = current.as_ref().map(|v| v.version);

        match update(current.map(|v| v.value)) {
            Step::Abort(result) => return Ok(result),
            Step::Commit(next, result) => {
                if store.compare_and_swap(key, expected_version, &next).await? {
                    debug!(%key, attempt, next = next.next_bundle_number, "Counter committed");
                    return Ok(result);
                }
            },
        }

        debug!(%key, attempt, "Counter write lost a race, retrying");
        if attempt < max_attempts && !policy.backoff.is_zero() {
            tokio::time::sleep(policy.backoff * attempt).await;
        }
    }

    warn!(%key, attempts = max_attempts, "Counter transaction gave up");
    Err(TrancheError::AllocationConflict {
        attempts: max_attempts,
    })
}

/// Issue the next bundle number for `key`.
///
/// A missing counter is created and yields 1; otherwise the smallest gap is
/// reused before a fresh number is taken.
pub async fn allocate_bundle<S>(store: &S, key: &CounterKey, policy: &RetryPolicy) -> Result<u32>
where
    S: CounterStore + ?Sized,
{
    run_transaction(store, key, policy, |current| match current {
        None => {
            let (counter, issued) = BundleCounter::first_allocation();
            Step::Commit(counter, issued)
        },
        Some(mut counter) => {
            let issued = counter.take_next();
            Step::Commit(counter, issued)
        },
    })
    .await
}

/// Return `bundle_number` to the gap pool of `key`. Idempotent.
///
/// Returns whether the pool changed. Missing counters and numbers that were
/// never issued leave the store untouched.
pub async fn recycle_bundle<S>(
    store: &S,
    key: &CounterKey,
    bundle_number: u32,
    policy: &RetryPolicy,
) -> Result<bool>
where
    S: CounterStore + ?Sized,
{
    run_transaction(store, key, policy, |current| {
        let Some(mut counter) = current else {
            warn!(%key, bundle_number, "No counter to recycle into");
            return Step::Abort(false);
        };
        if bundle_number >= counter.next_bundle_number || bundle_number == 0 {
            warn!(
                %key,
                bundle_number,
                next = counter.next_bundle_number,
                "Refusing to recycle a bundle number that was never issued"
            );
            return Step::Abort(false);
        }
        if counter.recycle(bundle_number) {
            Step::Commit(counter, true)
        } else {
            Step::Abort(false)
        }
    })
    .await
}

/// Keep allocation from ever issuing `bundle_number`, which an administrator
/// assigned directly. Returns whether the counter changed.
pub async fn reserve_bundle<S>(
    store: &S,
    key: &CounterKey,
    bundle_number: u32,
    policy: &RetryPolicy,
) -> Result<bool>
where
    S: CounterStore + ?Sized,
{
    if bundle_number == 0 {
        return Err(TrancheError::InvalidInput(
            "bundle number must be greater than 0".into(),
        ));
    }
    run_transaction(store, key, policy, |current| match current {
        None => Step::Commit(BundleCounter::reserved_from_scratch(bundle_number), true),
        Some(mut counter) => {
            if counter.reserve(bundle_number) {
                Step::Commit(counter, true)
            } else {
                Step::Abort(false)
            }
        },
    })
    .await
}
