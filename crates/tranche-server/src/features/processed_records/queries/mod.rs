pub mod export;

pub use export::{ExportRecordsError, ExportRecordsQuery, ExportedRecord};
