//! Override signal routes
//!
//! - `GET /api/v1/signals/:worker_id` - Unacknowledged signals keyed by sub-region
//! - `DELETE /api/v1/signals/:worker_id/:sub_region` - Acknowledge a signal

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{delete, get},
    Router,
};
use sqlx::PgPool;

use super::commands::{AcknowledgeSignalCommand, AcknowledgeSignalError};
use super::queries::{ListSignalsError, ListSignalsQuery};
use crate::api::response::{ApiResponse, ApiResult, AppError};

pub fn signals_routes() -> Router<PgPool> {
    Router::new()
        .route("/:worker_id", get(list_signals))
        .route("/:worker_id/:sub_region", delete(acknowledge_signal))
}

#[tracing::instrument(skip(pool))]
async fn list_signals(
    State(pool): State<PgPool>,
    Path(worker_id): Path<String>,
) -> ApiResult<Response> {
    let signals = super::queries::list::handle(pool, ListSignalsQuery { worker_id }).await?;
    Ok(ApiResponse::success(signals).into_response())
}

#[tracing::instrument(skip(pool))]
async fn acknowledge_signal(
    State(pool): State<PgPool>,
    Path((worker_id, sub_region)): Path<(String, String)>,
) -> ApiResult<Response> {
    let command = AcknowledgeSignalCommand {
        worker_id,
        sub_region,
    };
    let response = super::commands::acknowledge::handle(pool, command).await?;
    Ok(ApiResponse::success(response).into_response())
}

impl From<ListSignalsError> for AppError {
    fn from(err: ListSignalsError) -> Self {
        match err {
            ListSignalsError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<AcknowledgeSignalError> for AppError {
    fn from(err: AcknowledgeSignalError) -> Self {
        match err {
            AcknowledgeSignalError::Validation(e) => AppError::ValidationError(e.to_string()),
            AcknowledgeSignalError::Database(e) => AppError::Database(e),
        }
    }
}
