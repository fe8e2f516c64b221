//! Worker state routes
//!
//! - `GET /api/v1/user-states/:worker_id` - Active bundles of a worker
//! - `DELETE /api/v1/user-states/:worker_id` - Remove the whole state record
//! - `PUT /api/v1/user-states/:worker_id/active-bundles/:sub_region` - Store a newly allocated bundle
//! - `PATCH /api/v1/user-states/:worker_id/active-bundles/:sub_region` - Raise the count of a held bundle
//! - `DELETE /api/v1/user-states/:worker_id/active-bundles/:sub_region` - Remove one active bundle

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use sqlx::PgPool;

use super::commands::{
    ClearUserStateCommand, ClearUserStateError, PutActiveBundleCommand, PutActiveBundleError,
    RemoveActiveBundleCommand, RemoveActiveBundleError, UpdateBundleCountCommand,
    UpdateBundleCountError,
};
use super::queries::{GetUserStateError, GetUserStateQuery};
use crate::api::response::{ApiResponse, ApiResult, AppError};

pub fn user_states_routes() -> Router<PgPool> {
    Router::new()
        .route("/:worker_id", get(get_state).delete(clear_state))
        .route(
            "/:worker_id/active-bundles/:sub_region",
            put(put_active_bundle)
                .patch(update_bundle_count)
                .delete(remove_active_bundle),
        )
}

#[tracing::instrument(skip(pool))]
async fn get_state(State(pool): State<PgPool>, Path(worker_id): Path<String>) -> ApiResult<Response> {
    let view = super::queries::get::handle(pool, GetUserStateQuery { worker_id }).await?;
    Ok(ApiResponse::success(view).into_response())
}

#[tracing::instrument(skip(pool))]
async fn clear_state(
    State(pool): State<PgPool>,
    Path(worker_id): Path<String>,
) -> ApiResult<Response> {
    let response = super::commands::clear::handle(pool, ClearUserStateCommand { worker_id }).await?;
    Ok(ApiResponse::success(response).into_response())
}

#[tracing::instrument(skip(pool, command))]
async fn put_active_bundle(
    State(pool): State<PgPool>,
    Path((worker_id, sub_region)): Path<(String, String)>,
    Json(mut command): Json<PutActiveBundleCommand>,
) -> ApiResult<Response> {
    command.worker_id = worker_id;
    command.sub_region = sub_region;
    let bundle = super::commands::put_active_bundle::handle(pool, command).await?;
    Ok(ApiResponse::success(bundle).into_response())
}

#[tracing::instrument(skip(pool, command))]
async fn update_bundle_count(
    State(pool): State<PgPool>,
    Path((worker_id, sub_region)): Path<(String, String)>,
    Json(mut command): Json<UpdateBundleCountCommand>,
) -> ApiResult<Response> {
    command.worker_id = worker_id;
    command.sub_region = sub_region;
    let response = super::commands::update_count::handle(pool, command).await?;
    Ok(ApiResponse::success(response).into_response())
}

#[tracing::instrument(skip(pool))]
async fn remove_active_bundle(
    State(pool): State<PgPool>,
    Path((worker_id, sub_region)): Path<(String, String)>,
) -> ApiResult<Response> {
    let command = RemoveActiveBundleCommand {
        worker_id,
        sub_region,
    };
    let response = super::commands::remove_active_bundle::handle(pool, command).await?;
    Ok(ApiResponse::success(response).into_response())
}

impl From<GetUserStateError> for AppError {
    fn from(err: GetUserStateError) -> Self {
        match err {
            GetUserStateError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<PutActiveBundleError> for AppError {
    fn from(err: PutActiveBundleError) -> Self {
        match err {
            PutActiveBundleError::Validation(e) => AppError::ValidationError(e.to_string()),
            e @ PutActiveBundleError::CountOutOfRange(_) => AppError::ValidationError(e.to_string()),
            PutActiveBundleError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<UpdateBundleCountError> for AppError {
    fn from(err: UpdateBundleCountError) -> Self {
        match err {
            UpdateBundleCountError::Validation(e) => AppError::ValidationError(e.to_string()),
            e @ UpdateBundleCountError::CountOutOfRange(_) => AppError::ValidationError(e.to_string()),
            UpdateBundleCountError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<RemoveActiveBundleError> for AppError {
    fn from(err: RemoveActiveBundleError) -> Self {
        match err {
            RemoveActiveBundleError::Validation(e) => AppError::ValidationError(e.to_string()),
            RemoveActiveBundleError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<ClearUserStateError> for AppError {
    fn from(err: ClearUserStateError) -> Self {
        match err {
            ClearUserStateError::Validation(e) => AppError::ValidationError(e.to_string()),
            ClearUserStateError::Database(e) => AppError::Database(e),
        }
    }
}
