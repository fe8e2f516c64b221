//! API response types
//!
//! Success bodies are `{ "success": true, "data": ... }`, errors are
//! `{ "success": false, "error": { "code", "message" } }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tranche_common::TrancheError;

/// Standard success response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
            meta: None,
        }
    }

    pub fn success_with_meta(data: T, meta: serde_json::Value) -> Self {
        Self {
            success: true,
            data,
            meta: Some(meta),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Standard error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}

/// Error type every feature error converts into at the route layer
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    Unauthorized(String),
    Conflict(String),
    /// Lost every counter race; the client should simply try again.
    AllocationConflict(String),
    ValidationError(String),
    InternalError(String),
    Database(sqlx::Error),
}

impl AppError {
    fn parts(self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            AppError::AllocationConflict(msg) => {
                tracing::warn!("Allocation conflict: {}", msg);
                (StatusCode::CONFLICT, "ALLOCATION_CONFLICT", msg)
            },
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            },
            AppError::Database(err) => {
                tracing::error!("Database error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "A database error occurred".to_string(),
                )
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err)
    }
}

impl From<TrancheError> for AppError {
    fn from(err: TrancheError) -> Self {
        match err {
            TrancheError::AllocationConflict { .. } => AppError::AllocationConflict(err.to_string()),
            TrancheError::Unauthorized(msg) => AppError::Unauthorized(msg),
            TrancheError::InvalidInput(msg) => AppError::ValidationError(msg),
            other => AppError::InternalError(other.to_string()),
        }
    }
}

/// Alias for Result with AppError
pub type ApiResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_maps_to_retryable_code() {
        let (status, code, message) =
            AppError::from(TrancheError::AllocationConflict { attempts: 25 }).parts();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(code, "ALLOCATION_CONFLICT");
        assert!(message.contains("try again"));
    }

    #[test]
    fn test_unauthorized_keeps_message() {
        let (status, code, message) =
            AppError::from(TrancheError::Unauthorized("incorrect administrative password".into()))
                .parts();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(code, "UNAUTHORIZED");
        assert_eq!(message, "incorrect administrative password");
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let (status, _, message) = AppError::InternalError("disk on fire".into()).parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!message.contains("disk"));
    }

    #[test]
    fn test_success_envelope() {
        let body = serde_json::to_value(ApiResponse::success(vec![1, 2])).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"][1], 2);
        assert!(body.get("meta").is_none());
    }
}
