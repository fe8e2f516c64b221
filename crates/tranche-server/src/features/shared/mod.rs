//! Helpers shared by the feature slices

pub mod db_errors;
pub mod validation;
