//! Admin routes
//!
//! - `POST /api/v1/admin/reset-progress` - Wipe a worker's bundle and recycle its number
//! - `POST /api/v1/admin/force-complete` - Flag a worker's bundle complete
//! - `POST /api/v1/admin/manual-assign` - Give a worker a specific bundle
//! - `POST /api/v1/admin/release` - Drop a worker's active bundle
//! - `POST /api/v1/admin/purge-processed-records` - Delete all records (password)
//! - `POST /api/v1/admin/reset-counters` - Delete all counters and active bundles (password)

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};

use super::commands::{
    ForceCompleteError, ManualAssignCommand, ManualAssignError, PasswordCommand,
    PurgeRecordsError, ReleaseError, ResetCountersError, ResetProgressError,
};
use super::WorkerBundleTarget;
use crate::api::response::{ApiResponse, ApiResult, AppError};
use crate::features::FeatureState;

pub fn admin_routes() -> Router<FeatureState> {
    Router::new()
        .route("/reset-progress", post(reset_progress))
        .route("/force-complete", post(force_complete))
        .route("/manual-assign", post(manual_assign))
        .route("/release", post(release))
        .route("/purge-processed-records", post(purge_processed_records))
        .route("/reset-counters", post(reset_counters))
}

#[tracing::instrument(skip(state))]
async fn reset_progress(
    State(state): State<FeatureState>,
    Json(target): Json<WorkerBundleTarget>,
) -> ApiResult<Response> {
    let response =
        super::commands::reset_progress::handle(state.db, state.allocation, target).await?;
    Ok(ApiResponse::success(response).into_response())
}

#[tracing::instrument(skip(state))]
async fn force_complete(
    State(state): State<FeatureState>,
    Json(target): Json<WorkerBundleTarget>,
) -> ApiResult<Response> {
    let response = super::commands::force_complete::handle(state.db, target).await?;
    Ok(ApiResponse::success(response).into_response())
}

#[tracing::instrument(skip(state))]
async fn manual_assign(
    State(state): State<FeatureState>,
    Json(command): Json<ManualAssignCommand>,
) -> ApiResult<Response> {
    let response =
        super::commands::manual_assign::handle(state.db, state.allocation, command).await?;
    Ok(ApiResponse::success(response).into_response())
}

#[tracing::instrument(skip(state))]
async fn release(
    State(state): State<FeatureState>,
    Json(target): Json<WorkerBundleTarget>,
) -> ApiResult<Response> {
    let response = super::commands::release::handle(state.db, target).await?;
    Ok(ApiResponse::success(response).into_response())
}

#[tracing::instrument(skip_all)]
async fn purge_processed_records(
    State(state): State<FeatureState>,
    Json(command): Json<PasswordCommand>,
) -> ApiResult<Response> {
    let response = super::commands::purge_records::handle(
        state.db,
        state.admin_password_sha256.as_deref(),
        command,
    )
    .await?;
    Ok(ApiResponse::success(response).into_response())
}

#[tracing::instrument(skip_all)]
async fn reset_counters(
    State(state): State<FeatureState>,
    Json(command): Json<PasswordCommand>,
) -> ApiResult<Response> {
    let response = super::commands::reset_counters::handle(
        state.db,
        state.admin_password_sha256.as_deref(),
        command,
    )
    .await?;
    Ok(ApiResponse::success(response).into_response())
}

impl From<ResetProgressError> for AppError {
    fn from(err: ResetProgressError) -> Self {
        match err {
            ResetProgressError::Validation(e) => AppError::ValidationError(e.to_string()),
            e @ (ResetProgressError::WorkerNotFound(_)
            | ResetProgressError::NoActiveBundle { .. }) => AppError::NotFound(e.to_string()),
            ResetProgressError::Counter(e) => e.into(),
            ResetProgressError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<ForceCompleteError> for AppError {
    fn from(err: ForceCompleteError) -> Self {
        match err {
            ForceCompleteError::Validation(e) => AppError::ValidationError(e.to_string()),
            e @ (ForceCompleteError::WorkerNotFound(_)
            | ForceCompleteError::NoActiveBundle { .. }) => AppError::NotFound(e.to_string()),
            ForceCompleteError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<ManualAssignError> for AppError {
    fn from(err: ManualAssignError) -> Self {
        match err {
            ManualAssignError::Validation(e) => AppError::ValidationError(e.to_string()),
            e @ ManualAssignError::WorkerNotFound(_) => AppError::NotFound(e.to_string()),
            e @ ManualAssignError::HeldByAnotherWorker { .. } => AppError::Conflict(e.to_string()),
            ManualAssignError::Counter(e) => e.into(),
            ManualAssignError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<ReleaseError> for AppError {
    fn from(err: ReleaseError) -> Self {
        match err {
            ReleaseError::Validation(e) => AppError::ValidationError(e.to_string()),
            e @ ReleaseError::NoActiveBundle { .. } => AppError::NotFound(e.to_string()),
            ReleaseError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<PurgeRecordsError> for AppError {
    fn from(err: PurgeRecordsError) -> Self {
        match err {
            PurgeRecordsError::Unauthorized(e) => e.into(),
            PurgeRecordsError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<ResetCountersError> for AppError {
    fn from(err: ResetCountersError) -> Self {
        match err {
            ResetCountersError::Unauthorized(e) => e.into(),
            ResetCountersError::Database(e) => AppError::Database(e),
        }
    }
}
