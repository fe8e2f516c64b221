//! Error types for the worker
//!
//! Messages are shown to the person operating the worker, so each one says
//! what to do next.

use thiserror::Error;
use tranche_common::TrancheError;

/// Result type alias for worker operations
pub type Result<T> = std::result::Result<T, WorkerError>;

#[derive(Error, Debug)]
pub enum WorkerError {
    /// A bundle for the sub-region is still being filled
    #[error("Bundle {bundle_number} for '{sub_region}' is still in progress ({count}/250). Finish it before requesting another.")]
    BundleInProgress {
        sub_region: String,
        bundle_number: u32,
        count: u32,
    },

    /// A full bundle still has records that were never synced
    #[error("Bundle {bundle_number} for '{sub_region}' is full but {unsynced} record(s) are not synced. Run 'tranche sync-out' first.")]
    SyncRequired {
        sub_region: String,
        bundle_number: u32,
        unsynced: i64,
    },

    /// An active bundle is still registered for the sub-region
    #[error("Bundle {bundle_number} for '{sub_region}' is still active. Run 'tranche sync-out' to complete it, or ask an administrator to release it.")]
    BundleAlreadyActive {
        sub_region: String,
        bundle_number: u32,
    },

    #[error("No active bundle for '{0}'. Run 'tranche bundle request {0}' first.")]
    NoActiveBundle(String),

    #[error("Bundle {bundle_number} for '{sub_region}' is full. Run 'tranche sync-out', then request a new bundle.")]
    BundleFull {
        sub_region: String,
        bundle_number: u32,
    },

    #[error("Record '{record_id}' was already processed as {unique_id}.")]
    AlreadyProcessed {
        record_id: String,
        unique_id: String,
    },

    #[error("Record '{0}' is not in the local cache. Run 'tranche sync-in' if the dataset changed.")]
    RecordNotFound(String),

    #[error("Record '{0}' has no sub-region (taluka) value and cannot be processed.")]
    MissingSubRegion(String),

    #[error("Dataset '{name}' was not found in region '{region}'. Check the assigned dataset name.")]
    DatasetNotFound { region: String, name: String },

    #[error("Dataset '{0}' has no 'Search from' column.")]
    MissingRecordIdColumn(String),

    #[error("Nothing to do: {0}")]
    NoRecords(String),

    /// Counter updates kept losing races on the server
    #[error("The bundle counter is busy ({0}). Please try again.")]
    AllocationConflict(String),

    /// Network or server storage failure
    #[error("Remote store unavailable: {0}. Check the connection and 'server_url', then retry; completed steps are kept.")]
    RemoteUnavailable(String),

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    /// The server rejected the request
    #[error("Server error ({code}): {message}")]
    Api { code: String, message: String },

    #[error("Local cache error: {0}. Try 'tranche purge' if the cache is corrupted.")]
    Cache(String),

    #[error("Local database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}. Run 'tranche config show' to review the settings.")]
    Config(String),

    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WorkerError {
    pub fn cache(msg: impl Into<String>) -> Self {
        Self::Cache(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn remote(msg: impl Into<String>) -> Self {
        Self::RemoteUnavailable(msg.into())
    }

    /// Local precondition failures; these never reach the network.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::BundleInProgress { .. }
                | Self::SyncRequired { .. }
                | Self::BundleAlreadyActive { .. }
                | Self::NoActiveBundle(_)
                | Self::BundleFull { .. }
                | Self::AlreadyProcessed { .. }
        )
    }
}

impl From<reqwest::Error> for WorkerError {
    fn from(err: reqwest::Error) -> Self {
        Self::RemoteUnavailable(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for WorkerError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Cache(format!("migration failed: {err}"))
    }
}

impl From<TrancheError> for WorkerError {
    fn from(err: TrancheError) -> Self {
        match err {
            TrancheError::AllocationConflict { .. } => Self::AllocationConflict(err.to_string()),
            TrancheError::Unauthorized(msg) => Self::Unauthorized(msg),
            TrancheError::Storage(msg) => Self::RemoteUnavailable(msg),
            TrancheError::Config(msg) => Self::Config(msg),
            TrancheError::Serialization(e) => Self::JsonParse(e),
            TrancheError::InvalidInput(msg) => Self::Api {
                code: "VALIDATION_ERROR".into(),
                message: msg,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_classification() {
        assert!(WorkerError::NoActiveBundle("Paithan".into()).is_precondition());
        assert!(!WorkerError::remote("timeout").is_precondition());
    }

    #[test]
    fn test_conflict_maps_from_shared_error() {
        let err = WorkerError::from(TrancheError::AllocationConflict { attempts: 3 });
        assert!(matches!(err, WorkerError::AllocationConflict(_)));
        assert!(err.to_string().contains("try again"));
    }
}
