//! Create user command

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::shared::db_errors::is_unique_violation;
use crate::features::shared::validation::{require, ValidationError};
use crate::features::users::{User, USER_COLUMNS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserCommand {
    /// Generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub username: String,
    #[serde(default)]
    pub mobile: String,
    pub region: String,
    #[serde(default)]
    pub dataset_name: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateUserError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("mobile number must contain 10 digits")]
    InvalidMobile,

    #[error("User with username '{0}' or the same id already exists")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Accepts an empty mobile number or exactly ten digits.
pub(crate) fn valid_mobile(mobile: &str) -> bool {
    let mobile = mobile.trim();
    mobile.is_empty() || (mobile.len() == 10 && mobile.chars().all(|c| c.is_ascii_digit()))
}

impl CreateUserCommand {
    pub fn validate(&self) -> Result<(), CreateUserError> {
        require(&self.name, "name", 200)?;
        require(&self.username, "username", 100)?;
        require(&self.region, "region", 100)?;
        if let Some(id) = &self.id {
            require(id, "id", 128)?;
        }
        if !valid_mobile(&self.mobile) {
            return Err(CreateUserError::InvalidMobile);
        }
        Ok(())
    }
}

#[tracing::instrument(skip(pool, command), fields(username = %command.username))]
pub async fn handle(pool: PgPool, command: CreateUserCommand) -> Result<User, CreateUserError> {
    command.validate()?;

    let id = command
        .id
        .as_deref()
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let sql = format!(
        r#"
        INSERT INTO users (id, name, username, mobile, region, dataset_name)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {USER_COLUMNS}
        "#
    );

    let user: User = sqlx::query_as(&sql)
        .bind(&id)
        .bind(command.name.trim())
        .bind(command.username.trim())
        .bind(command.mobile.trim())
        .bind(command.region.trim())
        .bind(command.dataset_name.as_deref().map(str::trim))
        .fetch_one(&pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CreateUserError::Duplicate(command.username.clone())
            } else {
                CreateUserError::Database(e)
            }
        })?;

    tracing::info!(user_id = %user.id, "User created");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> CreateUserCommand {
        CreateUserCommand {
            id: None,
            name: "Asha Patil".into(),
            username: "asha".into(),
            mobile: "9876543210".into(),
            region: "ahilyanagar".into(),
            dataset_name: Some("survey.csv".into()),
        }
    }

    #[test]
    fn test_valid_command() {
        assert!(command().validate().is_ok());
    }

    #[test]
    fn test_mobile_rules() {
        let mut c = command();
        c.mobile = "12345".into();
        assert!(matches!(c.validate(), Err(CreateUserError::InvalidMobile)));
        c.mobile = String::new();
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_region_required() {
        let mut c = command();
        c.region = " ".into();
        assert!(matches!(
            c.validate(),
            Err(CreateUserError::Validation(ValidationError::Required("region")))
        ));
    }
}
