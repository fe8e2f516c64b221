//! Request validation helpers

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("bundle number must be greater than 0")]
    BundleNumber,
}

/// Reject blank values and values longer than `max` characters.
pub fn require(value: &str, field: &'static str, max: usize) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required(field));
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

pub fn require_bundle_number(bundle_number: i64) -> Result<(), ValidationError> {
    if bundle_number <= 0 || bundle_number > i64::from(i32::MAX) {
        return Err(ValidationError::BundleNumber);
    }
    Ok(())
}
