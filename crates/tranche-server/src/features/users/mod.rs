//! Worker identities (`users/{userId}`)

pub mod commands;
pub mod queries;
pub mod routes;

pub use routes::users_routes;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A worker as stored on the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub username: String,
    pub mobile: String,
    pub region: String,
    pub dataset_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub(crate) const USER_COLUMNS: &str =
    "id, name, username, mobile, region, dataset_name, created_at, updated_at";
