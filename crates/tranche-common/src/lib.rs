//! Tranche Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared domain types, the bundle counter transaction, and error handling for
//! the tranche workspace.
//!
//! # Overview
//!
//! - **Types**: bundles, counters, override signals, processed records
//! - **Counter**: optimistic compare-and-swap allocation over any [`counter::CounterStore`]
//! - **Fields**: lookups over loosely-typed spreadsheet rows
//! - **Codes**: region codes and unique id derivation
//!
//! # Example
//!
//! ```no_run
//! use tranche_common::counter::{allocate_bundle, memory::InMemoryCounterStore, CounterKey, RetryPolicy};
//!
//! # async fn run() -> tranche_common::Result<()> {
//! let store = InMemoryCounterStore::new();
//! let key = CounterKey::new("ahilyanagar", "Paithan");
//! let first = allocate_bundle(&store, &key, &RetryPolicy::default()).await?;
//! assert_eq!(first, 1);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod codes;
pub mod counter;
pub mod error;
pub mod fields;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{Result, TrancheError};
pub use types::BUNDLE_CAPACITY;
