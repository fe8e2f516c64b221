//! Database error classification

/// Whether `err` is a unique constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

/// Convert a sqlx error into the storage error of the shared crate.
pub fn to_storage_error(err: sqlx::Error) -> tranche_common::TrancheError {
    tranche_common::TrancheError::storage(err.to_string())
}
