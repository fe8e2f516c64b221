//! Error types for tranche

use thiserror::Error;

/// Result type alias for tranche operations
pub type Result<T> = std::result::Result<T, TrancheError>;

/// Main error type shared by the server and the worker
#[derive(Error, Debug)]
pub enum TrancheError {
    /// The optimistic counter transaction lost every race it entered.
    #[error("Bundle counter is busy after {attempts} attempts, please try again")]
    AllocationConflict { attempts: u32 },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl TrancheError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Whether the caller may simply repeat the operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::AllocationConflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_conflicts_are_retryable() {
        assert!(TrancheError::AllocationConflict { attempts: 3 }.is_retryable());
        assert!(!TrancheError::storage("disk full").is_retryable());
        assert!(!TrancheError::Unauthorized("bad password".into()).is_retryable());
    }

    #[test]
    fn test_conflict_message_mentions_attempts() {
        let msg = TrancheError::AllocationConflict { attempts: 25 }.to_string();
        assert!(msg.contains("25 attempts"));
    }
}
