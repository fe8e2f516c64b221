//! Bundle counter routes
//!
//! - `GET /api/v1/bundle-counters?region=` - List counters with the next number to assign
//! - `POST /api/v1/bundle-counters/:region/:sub_region/allocate` - Issue a bundle number
//! - `POST /api/v1/bundle-counters/:region/:sub_region/recycle` - Return a number to the gap pool

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use super::commands::{
    AllocateBundleCommand, AllocateBundleError, RecycleBundleCommand, RecycleBundleError,
};
use super::queries::{ListCountersError, ListCountersQuery};
use crate::api::response::{ApiResponse, ApiResult, AppError};
use crate::features::FeatureState;

pub fn bundle_counters_routes() -> Router<FeatureState> {
    Router::new()
        .route("/", get(list_counters))
        .route("/:region/:sub_region/allocate", post(allocate))
        .route("/:region/:sub_region/recycle", post(recycle))
}

#[tracing::instrument(skip(state))]
async fn allocate(
    State(state): State<FeatureState>,
    Path((region, sub_region)): Path<(String, String)>,
) -> ApiResult<Response> {
    let command = AllocateBundleCommand { region, sub_region };
    let response = super::commands::allocate::handle(state.db, state.allocation, command).await?;
    Ok(ApiResponse::success(response).into_response())
}

#[tracing::instrument(skip(state, command))]
async fn recycle(
    State(state): State<FeatureState>,
    Path((region, sub_region)): Path<(String, String)>,
    Json(mut command): Json<RecycleBundleCommand>,
) -> ApiResult<Response> {
    command.region = region;
    command.sub_region = sub_region;
    let response = super::commands::recycle::handle(state.db, state.allocation, command).await?;
    Ok(ApiResponse::success(response).into_response())
}

#[tracing::instrument(skip(state))]
async fn list_counters(
    State(state): State<FeatureState>,
    Query(query): Query<ListCountersQuery>,
) -> ApiResult<Response> {
    let counters = super::queries::list::handle(state.db, query).await?;
    Ok(ApiResponse::success(counters).into_response())
}

impl From<AllocateBundleError> for AppError {
    fn from(err: AllocateBundleError) -> Self {
        match err {
            AllocateBundleError::Validation(e) => AppError::ValidationError(e.to_string()),
            AllocateBundleError::Counter(e) => e.into(),
        }
    }
}

impl From<RecycleBundleError> for AppError {
    fn from(err: RecycleBundleError) -> Self {
        match err {
            RecycleBundleError::Validation(e) => AppError::ValidationError(e.to_string()),
            RecycleBundleError::Counter(e) => e.into(),
        }
    }
}

impl From<ListCountersError> for AppError {
    fn from(err: ListCountersError) -> Self {
        match err {
            ListCountersError::Database(e) => AppError::Database(e),
        }
    }
}
