//! Domain types shared by the server and the worker

mod bundle;
mod record;
mod signal;

pub use bundle::{ActiveBundle, ActiveBundles, BundleCounter};
pub use record::{Dataset, DatasetSummary, FieldMap, ProcessedRecord, RecordStatus, SourceRow};
pub use signal::{OverrideSignal, SignalKind};

/// Number of records in one bundle. Fixed system-wide.
pub const BUNDLE_CAPACITY: u32 = 250;
