//! Processed record routes
//!
//! - `PUT /api/v1/processed-records/:region/:sub_region/:bundle_number/:unique_id` - Write a record
//! - `GET /api/v1/processed-records/:region/export` - All records of a region with worker details

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use sqlx::PgPool;

use super::commands::{WriteRecordCommand, WriteRecordError};
use super::queries::{ExportRecordsError, ExportRecordsQuery};
use crate::api::response::{ApiResponse, ApiResult, AppError};

pub fn processed_records_routes() -> Router<PgPool> {
    Router::new()
        .route("/:region/:sub_region/:bundle_number/:unique_id", put(write_record))
        .route("/:region/export", get(export_records))
}

#[tracing::instrument(skip(pool, command))]
async fn write_record(
    State(pool): State<PgPool>,
    Path((region, sub_region, bundle_number, unique_id)): Path<(String, String, i64, String)>,
    Json(mut command): Json<WriteRecordCommand>,
) -> ApiResult<Response> {
    command.region = region;
    command.sub_region = sub_region;
    command.bundle_number = bundle_number;
    command.unique_id = unique_id;
    let response = super::commands::write::handle(pool, command).await?;
    Ok(ApiResponse::success(response).into_response())
}

#[tracing::instrument(skip(pool))]
async fn export_records(
    State(pool): State<PgPool>,
    Path(region): Path<String>,
) -> ApiResult<Response> {
    let records = super::queries::export::handle(pool, ExportRecordsQuery { region }).await?;
    let meta = serde_json::json!({ "count": records.len() });
    Ok(ApiResponse::success_with_meta(records, meta).into_response())
}

impl From<WriteRecordError> for AppError {
    fn from(err: WriteRecordError) -> Self {
        match err {
            WriteRecordError::Validation(e) => AppError::ValidationError(e.to_string()),
            WriteRecordError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<ExportRecordsError> for AppError {
    fn from(err: ExportRecordsError) -> Self {
        match err {
            ExportRecordsError::Database(e) => AppError::Database(e),
        }
    }
}
