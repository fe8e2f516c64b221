//! Read-only progress overview for administrators

pub mod queries;
pub mod routes;

pub use routes::analytics_routes;
