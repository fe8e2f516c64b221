use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::BUNDLE_CAPACITY;

/// Per-(region, sub-region) allocation state.
///
/// Every number in `[1, next_bundle_number)` has been issued once. Numbers in
/// `gaps` were abandoned and may be issued again; they are always below
/// `next_bundle_number`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleCounter {
    pub next_bundle_number: u32,
    #[serde(default)]
    pub gaps: Vec<u32>,
}

impl BundleCounter {
    /// Counter state after the very first allocation, which hands out 1.
    pub fn first_allocation() -> (Self, u32) {
        (
            Self {
                next_bundle_number: 2,
                gaps: Vec::new(),
            },
            1,
        )
    }

    /// Take the smallest gap, or the next fresh number.
    pub fn take_next(&mut self) -> u32 {
        if self.gaps.is_empty() {
            let issued = self.next_bundle_number;
            self.next_bundle_number += 1;
            issued
        } else {
            self.gaps.sort_unstable();
            self.gaps.remove(0)
        }
    }

    /// Add `bundle_number` to the gap pool. Returns `false` when the number is
    /// already a gap or was never issued.
    pub fn recycle(&mut self, bundle_number: u32) -> bool {
        if bundle_number == 0
            || bundle_number >= self.next_bundle_number
            || self.gaps.contains(&bundle_number)
        {
            return false;
        }
        self.gaps.push(bundle_number);
        self.gaps.sort_unstable();
        true
    }

    /// Take `bundle_number` out of circulation for an assignment that bypassed
    /// allocation. A gap is removed from the pool; a number at or past
    /// `next_bundle_number` moves the counter beyond it and pools the numbers
    /// skipped on the way. Returns `false` when nothing changed.
    pub fn reserve(&mut self, bundle_number: u32) -> bool {
        if bundle_number == 0 {
            return false;
        }
        if let Some(pos) = self.gaps.iter().position(|g| *g == bundle_number) {
            self.gaps.remove(pos);
            return true;
        }
        if bundle_number < self.next_bundle_number {
            return false;
        }
        self.gaps.extend(self.next_bundle_number..bundle_number);
        self.gaps.sort_unstable();
        self.next_bundle_number = bundle_number + 1;
        true
    }

    /// Counter for a sub-region whose first number came from a manual
    /// assignment rather than allocation.
    pub fn reserved_from_scratch(bundle_number: u32) -> Self {
        Self {
            next_bundle_number: bundle_number + 1,
            gaps: (1..bundle_number).collect(),
        }
    }

    /// The number the next allocation would return.
    pub fn next_to_assign(&self) -> u32 {
        self.gaps
            .iter()
            .copied()
            .min()
            .unwrap_or(self.next_bundle_number)
    }
}

/// A worker's claim on one bundle of one sub-region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveBundle {
    pub sub_region: String,
    pub bundle_number: u32,
    /// Records processed against this bundle, in `[0, BUNDLE_CAPACITY]`.
    pub count: u32,
}

impl ActiveBundle {
    pub fn new(sub_region: impl Into<String>, bundle_number: u32) -> Self {
        Self {
            sub_region: sub_region.into(),
            bundle_number,
            count: 0,
        }
    }

    pub fn is_full(&self) -> bool {
        self.count >= BUNDLE_CAPACITY
    }

    pub fn remaining(&self) -> u32 {
        BUNDLE_CAPACITY.saturating_sub(self.count)
    }

    /// Zero-based position of the next record across all bundles of the
    /// sub-region: `(bundle_number - 1) * capacity + count`.
    pub fn next_sequence(&self) -> u64 {
        u64::from(self.bundle_number.saturating_sub(1)) * u64::from(BUNDLE_CAPACITY)
            + u64::from(self.count)
    }
}

/// A worker's active bundles keyed by sub-region. At most one per sub-region.
pub type ActiveBundles = BTreeMap<String, ActiveBundle>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_first_allocation_issues_one() {
        let (counter, issued) = BundleCounter::first_allocation();
        assert_eq!(issued, 1);
        assert_eq!(counter.next_bundle_number, 2);
        assert!(counter.gaps.is_empty());
    }

    #[test]
    fn test_reserve_removes_gap_or_skips_ahead() {
        let mut counter = BundleCounter {
            next_bundle_number: 4,
            gaps: vec![2],
        };
        assert!(counter.reserve(2));
        assert!(counter.gaps.is_empty());
        assert!(!counter.reserve(3));

        assert!(counter.reserve(6));
        assert_eq!(counter.next_bundle_number, 7);
        assert_eq!(counter.gaps, vec![4, 5]);
        assert_eq!(counter.take_next(), 4);

        assert!(!counter.reserve(0));
        assert_eq!(BundleCounter::reserved_from_scratch(3).gaps, vec![1, 2]);
    }

    #[test]
    fn test_take_next_prefers_smallest_gap() {
        let mut counter = BundleCounter {
            next_bundle_number: 9,
            gaps: vec![7, 3, 5],
        };
        assert_eq!(counter.take_next(), 3);
        assert_eq!(counter.take_next(), 5);
        assert_eq!(counter.take_next(), 7);
        assert_eq!(counter.take_next(), 9);
        assert_eq!(counter.next_bundle_number, 10);
    }

    #[test]
    fn test_recycle_is_idempotent() {
        let mut counter = BundleCounter {
            next_bundle_number: 5,
            gaps: vec![],
        };
        assert!(counter.recycle(3));
        assert!(!counter.recycle(3));
        assert_eq!(counter.gaps, vec![3]);
    }

    #[test]
    fn test_recycle_rejects_unissued_numbers() {
        let mut counter = BundleCounter {
            next_bundle_number: 5,
            gaps: vec![],
        };
        assert!(!counter.recycle(0));
        assert!(!counter.recycle(5));
        assert!(!counter.recycle(42));
        assert!(counter.gaps.is_empty());
    }

    #[test]
    fn test_next_to_assign() {
        let counter = BundleCounter {
            next_bundle_number: 4,
            gaps: vec![2],
        };
        assert_eq!(counter.next_to_assign(), 2);
        let (fresh, _) = BundleCounter::first_allocation();
        assert_eq!(fresh.next_to_assign(), 2);
    }

    #[test]
    fn test_next_sequence_spans_bundles() {
        let mut bundle = ActiveBundle::new("Paithan", 1);
        assert_eq!(bundle.next_sequence(), 0);
        bundle.count = 249;
        assert_eq!(bundle.next_sequence(), 249);

        let mut second = ActiveBundle::new("Paithan", 2);
        assert_eq!(second.next_sequence(), 250);
        second.count = 10;
        assert_eq!(second.next_sequence(), 260);
        assert_eq!(second.remaining(), 240);
        assert!(!second.is_full());
    }

    #[test]
    fn test_counter_wire_format() {
        let counter: BundleCounter =
            serde_json::from_str(r#"{"next_bundle_number": 3}"#).unwrap();
        assert!(counter.gaps.is_empty());
    }
}
