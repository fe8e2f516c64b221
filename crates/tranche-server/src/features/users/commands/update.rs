//! Update user command

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::create::valid_mobile;
use crate::features::shared::db_errors::is_unique_violation;
use crate::features::shared::validation::{require, ValidationError};
use crate::features::users::{User, USER_COLUMNS};

/// Only the fields present are changed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserCommand {
    #[serde(default)]
    pub id: String,
    pub name: Option<String>,
    pub username: Option<String>,
    pub mobile: Option<String>,
    pub region: Option<String>,
    pub dataset_name: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum UpdateUserError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("No fields to update")]
    NoFieldsToUpdate,

    #[error("mobile number must contain 10 digits")]
    InvalidMobile,

    #[error("User '{0}' not found")]
    NotFound(String),

    #[error("Username '{0}' is already taken")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl UpdateUserCommand {
    pub fn validate(&self) -> Result<(), UpdateUserError> {
        require(&self.id, "id", 128)?;
        if self.name.is_none()
            && self.username.is_none()
            && self.mobile.is_none()
            && self.region.is_none()
            && self.dataset_name.is_none()
        {
            return Err(UpdateUserError::NoFieldsToUpdate);
        }
        if let Some(name) = &self.name {
            require(name, "name", 200)?;
        }
        if let Some(username) = &self.username {
            require(username, "username", 100)?;
        }
        if let Some(region) = &self.region {
            require(region, "region", 100)?;
        }
        if self.mobile.as_deref().is_some_and(|m| !valid_mobile(m)) {
            return Err(UpdateUserError::InvalidMobile);
        }
        Ok(())
    }
}

#[tracing::instrument(skip(pool, command), fields(user_id = %command.id))]
pub async fn handle(pool: PgPool, command: UpdateUserCommand) -> Result<User, UpdateUserError> {
    command.validate()?;

    let trim = |v: &Option<String>| v.as_deref().map(|s| s.trim().to_string());
    let sql = format!(
        r#"
        UPDATE users
        SET name = COALESCE($2, name),
            username = COALESCE($3, username),
            mobile = COALESCE($4, mobile),
            region = COALESCE($5, region),
            dataset_name = COALESCE($6, dataset_name),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#
    );

    let user: Option<User> = sqlx::query_as(&sql)
        .bind(command.id.trim())
        .bind(trim(&command.name))
        .bind(trim(&command.username))
        .bind(trim(&command.mobile))
        .bind(trim(&command.region))
        .bind(trim(&command.dataset_name))
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                UpdateUserError::Duplicate(command.username.clone().unwrap_or_default())
            } else {
                UpdateUserError::Database(e)
            }
        })?;

    let user = user.ok_or_else(|| UpdateUserError::NotFound(command.id.clone()))?;
    tracing::info!("User updated");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_update_is_rejected() {
        let command = UpdateUserCommand {
            id: "u1".into(),
            ..Default::default()
        };
        assert!(matches!(command.validate(), Err(UpdateUserError::NoFieldsToUpdate)));
    }

    #[test]
    fn test_partial_update_is_valid() {
        let command = UpdateUserCommand {
            id: "u1".into(),
            dataset_name: Some("round-2.csv".into()),
            ..Default::default()
        };
        assert!(command.validate().is_ok());
    }
}
