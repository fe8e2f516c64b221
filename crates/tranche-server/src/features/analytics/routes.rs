//! Analytics routes
//!
//! - `GET /api/v1/analytics/summary?region=` - Dataset and bundle progress

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use sqlx::PgPool;

use super::queries::{SummaryError, SummaryQuery};
use crate::api::response::{ApiResponse, ApiResult, AppError};

pub fn analytics_routes() -> Router<PgPool> {
    Router::new().route("/summary", get(summary))
}

#[tracing::instrument(skip(pool))]
async fn summary(
    State(pool): State<PgPool>,
    Query(query): Query<SummaryQuery>,
) -> ApiResult<Response> {
    let summary = super::queries::summary::handle(pool, query).await?;
    Ok(ApiResponse::success(summary).into_response())
}

impl From<SummaryError> for AppError {
    fn from(err: SummaryError) -> Self {
        match err {
            SummaryError::Database(e) => AppError::Database(e),
        }
    }
}
