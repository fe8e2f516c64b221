//! Canonical processed records
//! (`processedRecords/{region}/{subRegion}/bundle-{n}/{uniqueId}`)
//!
//! The composite key is the idempotency key of sync-out: writing the same
//! record twice leaves one row with identical content.

pub mod commands;
pub mod queries;
pub mod routes;

pub use routes::processed_records_routes;
