//! Worker state records
//!
//! Each worker owns at most one active bundle per sub-region. Workers write
//! their own progress here; admin actions clear or replace entries.

pub mod commands;
pub mod queries;
pub mod routes;

pub use routes::user_states_routes;

use tranche_common::types::ActiveBundle;

/// Row shape shared by the queries and commands of this slice.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ActiveBundleRow {
    pub sub_region: String,
    pub bundle_number: i32,
    pub count: i32,
}

impl From<ActiveBundleRow> for ActiveBundle {
    fn from(row: ActiveBundleRow) -> Self {
        ActiveBundle {
            sub_region: row.sub_region,
            bundle_number: row.bundle_number as u32,
            count: row.count as u32,
        }
    }
}
