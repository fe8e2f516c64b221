//! Process-local counter store with the same compare-and-swap contract as the
//! database-backed one.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{CounterKey, CounterStore, Versioned};
use crate::error::{Result, TrancheError};
use crate::types::BundleCounter;

#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    counters: Mutex<HashMap<CounterKey, Versioned<BundleCounter>>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a counter, if any.
    pub fn snapshot(&self, key: &CounterKey) -> Option<BundleCounter> {
        self.counters
            .lock()
            .ok()
            .and_then(|map| map.get(key).map(|v| v.value.clone()))
    }

    /// All counters, sorted by key.
    pub fn all(&self) -> Vec<(CounterKey, BundleCounter)> {
        let mut entries: Vec<_> = self
            .counters
            .lock()
            .map(|map| {
                map.iter()
                    .map(|(k, v)| (k.clone(), v.value.clone()))
                    .collect()
            })
            .unwrap_or_default();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn clear(&self) {
        if let Ok(mut map) = self.counters.lock() {
            map.clear();
        }
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn load(&self, key: &CounterKey) -> Result<Option<Versioned<BundleCounter>>> {
        let map = self
            .counters
            .lock()
            .map_err(|_| TrancheError::storage("counter store lock poisoned"))?;
        Ok(map.get(key).cloned())
    }

    async fn compare_and_swap(
        &self,
        key: &CounterKey,
        expected_version: Option<i64>,
        next: &BundleCounter,
    ) -> Result<bool> {
        let mut map = self
            .counters
            .lock()
            .map_err(|_| TrancheError::storage("counter store lock poisoned"))?;

        let current_version = map.get(key).map(|v| v.version);
        if current_version != expected_version {
            return Ok(false);
        }

        map.insert(
            key.clone(),
            Versioned {
                value: next.clone(),
                version: current_version.map_or(1, |v| v + 1),
            },
        );
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stale_version_is_refused() {
        let store = InMemoryCounterStore::new();
        let key = CounterKey::new("ahilyanagar", "Sillod");
        let (first, _) = BundleCounter::first_allocation();

        assert!(store.compare_and_swap(&key, None, &first).await.unwrap());
        assert!(!store.compare_and_swap(&key, None, &first).await.unwrap());

        let loaded = store.load(&key).await.unwrap().unwrap();
        assert_eq!(loaded.version, 1);

        let mut next = loaded.value.clone();
        next.take_next();
        assert!(store.compare_and_swap(&key, Some(1), &next).await.unwrap());
        assert!(!store.compare_and_swap(&key, Some(1), &next).await.unwrap());
        assert_eq!(store.load(&key).await.unwrap().unwrap().version, 2);
    }
}
