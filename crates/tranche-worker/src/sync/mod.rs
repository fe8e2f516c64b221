//! Sync-in and sync-out between the local cache and the remote store

mod sync_in;
mod sync_out;

pub use sync_in::{sync_in, SyncInReport, SYNC_IN_BATCH_SIZE};
pub use sync_out::{complete_full_bundles, sync_out, SyncOutReport};
