//! Feature slices of the canonical store
//!
//! Each slice owns its SQL and follows the same layout:
//! - `commands/` - writes, one module per operation
//! - `queries/` - reads
//! - `routes.rs` - axum routes and the mapping of slice errors to [`AppError`]
//!
//! [`AppError`]: crate::api::response::AppError
//!
//! # Slices
//!
//! - **bundle_counters**: the counter service (allocate, recycle, list)
//! - **user_states**: workers' active bundles
//! - **signals**: override signals waiting for acknowledgement
//! - **processed_records**: canonical results and their export
//! - **datasets**: uploaded source rows
//! - **users**: worker identities
//! - **admin**: overrides and bulk resets
//! - **analytics**: progress overview

pub mod admin;
pub mod analytics;
pub mod bundle_counters;
pub mod datasets;
pub mod processed_records;
pub mod shared;
pub mod signals;
pub mod user_states;
pub mod users;

use axum::Router;
use tranche_common::counter::RetryPolicy;

/// State for slices that need more than the pool.
#[derive(Clone)]
pub struct FeatureState {
    pub db: sqlx::PgPool,
    /// Retry budget of counter transactions.
    pub allocation: RetryPolicy,
    /// Hex SHA-256 of the admin password, if one is configured.
    pub admin_password_sha256: Option<String>,
}

/// Mount every slice under its path prefix.
pub fn router(state: FeatureState) -> Router<()> {
    Router::new()
        .nest("/users", users::users_routes().with_state(state.db.clone()))
        .nest("/datasets", datasets::datasets_routes().with_state(state.db.clone()))
        .nest(
            "/bundle-counters",
            bundle_counters::bundle_counters_routes().with_state(state.clone()),
        )
        .nest("/user-states", user_states::user_states_routes().with_state(state.db.clone()))
        .nest("/signals", signals::signals_routes().with_state(state.db.clone()))
        .nest(
            "/processed-records",
            processed_records::processed_records_routes().with_state(state.db.clone()),
        )
        .nest("/analytics", analytics::analytics_routes().with_state(state.db.clone()))
        .nest("/admin", admin::admin_routes().with_state(state))
}
