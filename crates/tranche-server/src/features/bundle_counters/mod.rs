//! Bundle counter service
//!
//! One counter per (region, sub-region) hands out bundle numbers. Allocation
//! is an optimistic read-modify-write over a versioned row, retried on lost
//! races up to the configured budget.

pub mod commands;
pub mod queries;
pub mod routes;
pub mod store;

pub use routes::bundle_counters_routes;
pub use store::PgCounterStore;
