//! Dataset routes
//!
//! - `GET /api/v1/datasets/:region` - Dataset summaries of a region
//! - `POST /api/v1/datasets/:region` - Upload a dataset
//! - `GET /api/v1/datasets/:region/by-name/:name` - Dataset with rows
//! - `DELETE /api/v1/datasets/:region/:id` - Delete a dataset

use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use sqlx::PgPool;
use uuid::Uuid;

use super::commands::{
    DeleteDatasetCommand, DeleteDatasetError, UploadDatasetCommand, UploadDatasetError,
};
use super::queries::{GetDatasetError, GetDatasetQuery, ListDatasetsError, ListDatasetsQuery};
use crate::api::response::{ApiResponse, ApiResult, AppError};

/// Spreadsheets with tens of thousands of rows exceed axum's default limit.
const UPLOAD_BODY_LIMIT: usize = 64 * 1024 * 1024;

pub fn datasets_routes() -> Router<PgPool> {
    Router::new()
        .route("/:region", get(list_datasets).post(upload_dataset))
        .route("/:region/by-name/:name", get(get_dataset))
        .route("/:region/:id", delete(delete_dataset))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
}

#[tracing::instrument(skip(pool, command))]
async fn upload_dataset(
    State(pool): State<PgPool>,
    Path(region): Path<String>,
    Json(mut command): Json<UploadDatasetCommand>,
) -> ApiResult<Response> {
    command.region = region;
    let summary = super::commands::upload::handle(pool, command).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(summary))).into_response())
}

#[tracing::instrument(skip(pool))]
async fn list_datasets(
    State(pool): State<PgPool>,
    Path(region): Path<String>,
) -> ApiResult<Response> {
    let datasets = super::queries::list::handle(pool, ListDatasetsQuery { region }).await?;
    Ok(ApiResponse::success(datasets).into_response())
}

#[tracing::instrument(skip(pool))]
async fn get_dataset(
    State(pool): State<PgPool>,
    Path((region, name)): Path<(String, String)>,
) -> ApiResult<Response> {
    let dataset = super::queries::get_by_name::handle(pool, GetDatasetQuery { region, name }).await?;
    Ok(ApiResponse::success(dataset).into_response())
}

#[tracing::instrument(skip(pool))]
async fn delete_dataset(
    State(pool): State<PgPool>,
    Path((region, id)): Path<(String, Uuid)>,
) -> ApiResult<Response> {
    let response = super::commands::delete::handle(pool, DeleteDatasetCommand { region, id }).await?;
    Ok(ApiResponse::success(response).into_response())
}

impl From<UploadDatasetError> for AppError {
    fn from(err: UploadDatasetError) -> Self {
        match err {
            UploadDatasetError::Validation(e) => AppError::ValidationError(e.to_string()),
            e @ UploadDatasetError::Empty => AppError::ValidationError(e.to_string()),
            e @ UploadDatasetError::Duplicate(_) => AppError::Conflict(e.to_string()),
            UploadDatasetError::Serialization(e) => AppError::InternalError(e.to_string()),
            UploadDatasetError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<ListDatasetsError> for AppError {
    fn from(err: ListDatasetsError) -> Self {
        match err {
            ListDatasetsError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<GetDatasetError> for AppError {
    fn from(err: GetDatasetError) -> Self {
        match err {
            e @ GetDatasetError::NotFound { .. } => AppError::NotFound(e.to_string()),
            GetDatasetError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<DeleteDatasetError> for AppError {
    fn from(err: DeleteDatasetError) -> Self {
        match err {
            e @ DeleteDatasetError::NotFound(_) => AppError::NotFound(e.to_string()),
            DeleteDatasetError::Database(e) => AppError::Database(e),
        }
    }
}
