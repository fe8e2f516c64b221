//! User routes
//!
//! - `POST /api/v1/users` - Create a user
//! - `GET /api/v1/users?region=` - List users
//! - `GET /api/v1/users/:id` - Get a user
//! - `PUT /api/v1/users/:id` - Update a user
//! - `DELETE /api/v1/users/:id` - Delete a user

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use sqlx::PgPool;

use super::commands::{
    CreateUserCommand, CreateUserError, DeleteUserCommand, DeleteUserError, UpdateUserCommand,
    UpdateUserError,
};
use super::queries::{GetUserError, GetUserQuery, ListUsersError, ListUsersQuery};
use crate::api::response::{ApiResponse, ApiResult, AppError};

pub fn users_routes() -> Router<PgPool> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
}

#[tracing::instrument(skip(pool, command), fields(username = %command.username))]
async fn create_user(
    State(pool): State<PgPool>,
    Json(command): Json<CreateUserCommand>,
) -> ApiResult<Response> {
    let user = super::commands::create::handle(pool, command).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))).into_response())
}

#[tracing::instrument(skip(pool, command))]
async fn update_user(
    State(pool): State<PgPool>,
    Path(id): Path<String>,
    Json(mut command): Json<UpdateUserCommand>,
) -> ApiResult<Response> {
    command.id = id;
    let user = super::commands::update::handle(pool, command).await?;
    Ok(ApiResponse::success(user).into_response())
}

#[tracing::instrument(skip(pool))]
async fn delete_user(State(pool): State<PgPool>, Path(id): Path<String>) -> ApiResult<Response> {
    let response = super::commands::delete::handle(pool, DeleteUserCommand { id }).await?;
    Ok(ApiResponse::success(response).into_response())
}

#[tracing::instrument(skip(pool))]
async fn get_user(State(pool): State<PgPool>, Path(id): Path<String>) -> ApiResult<Response> {
    let user = super::queries::get::handle(pool, GetUserQuery { id }).await?;
    Ok(ApiResponse::success(user).into_response())
}

#[tracing::instrument(skip(pool))]
async fn list_users(
    State(pool): State<PgPool>,
    Query(query): Query<ListUsersQuery>,
) -> ApiResult<Response> {
    let users = super::queries::list::handle(pool, query).await?;
    Ok(ApiResponse::success(users).into_response())
}

impl From<CreateUserError> for AppError {
    fn from(err: CreateUserError) -> Self {
        match err {
            CreateUserError::Validation(e) => AppError::ValidationError(e.to_string()),
            e @ CreateUserError::InvalidMobile => AppError::ValidationError(e.to_string()),
            e @ CreateUserError::Duplicate(_) => AppError::Conflict(e.to_string()),
            CreateUserError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<UpdateUserError> for AppError {
    fn from(err: UpdateUserError) -> Self {
        match err {
            UpdateUserError::Validation(e) => AppError::ValidationError(e.to_string()),
            e @ (UpdateUserError::NoFieldsToUpdate | UpdateUserError::InvalidMobile) => {
                AppError::ValidationError(e.to_string())
            },
            e @ UpdateUserError::NotFound(_) => AppError::NotFound(e.to_string()),
            e @ UpdateUserError::Duplicate(_) => AppError::Conflict(e.to_string()),
            UpdateUserError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<DeleteUserError> for AppError {
    fn from(err: DeleteUserError) -> Self {
        match err {
            e @ DeleteUserError::NotFound(_) => AppError::NotFound(e.to_string()),
            DeleteUserError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<GetUserError> for AppError {
    fn from(err: GetUserError) -> Self {
        match err {
            e @ GetUserError::NotFound(_) => AppError::NotFound(e.to_string()),
            GetUserError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<ListUsersError> for AppError {
    fn from(err: ListUsersError) -> Self {
        match err {
            ListUsersError::Database(e) => AppError::Database(e),
        }
    }
}
