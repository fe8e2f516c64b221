//! Tranche server library
//!
//! The canonical store of the bundle allocation system, served over HTTP.
//!
//! Workers allocate bundle numbers through the counter service, mirror their
//! active bundles into `user_states`, write processed records, and poll
//! `signals` for administrative overrides. Administrators upload datasets,
//! manage users, and override bundle assignments.
//!
//! # Architecture
//!
//! - **Axum** routes grouped into feature slices under [`features`]
//! - **SQLx** over PostgreSQL, runtime-checked queries
//! - **Tower** middleware for tracing, CORS and compression
//!
//! Bundle counters are updated with optimistic compare-and-swap through
//! [`features::bundle_counters::PgCounterStore`], which plugs into the shared
//! transaction of `tranche_common::counter`.
#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod api;
pub mod config;
pub mod db;
pub mod features;
pub mod middleware;

pub use api::response::{ApiResult, AppError};
