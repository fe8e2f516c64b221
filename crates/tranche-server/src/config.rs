//! Configuration management

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tranche_common::auth;
use tranche_common::counter::{RetryPolicy, DEFAULT_BACKOFF_MS, DEFAULT_MAX_ATTEMPTS};

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Default shutdown grace period in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 5;

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default minimum database connections in the pool.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 2;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default CORS allowed origin.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "*";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub allocation: AllocationConfig,
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

/// Retry budget of the bundle counter transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationConfig {
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl AllocationConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff: Duration::from_millis(self.backoff_ms),
        }
    }
}

/// Gate for destructive admin actions
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Hex SHA-256 of the admin password. `None` refuses every destructive action.
    pub password_sha256: Option<String>,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("password_sha256", &self.password_sha256.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Config {
    /// Load configuration from `.env`, the environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
            value.and_then(|s| s.trim().parse().ok()).unwrap_or(default)
        }

        let url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let config = Config {
            server: ServerConfig {
                host: lookup("TRANCHE_HOST").unwrap_or_else(|| DEFAULT_SERVER_HOST.to_string()),
                port: parsed(lookup("TRANCHE_PORT"), DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: parsed(
                    lookup("TRANCHE_SHUTDOWN_TIMEOUT_SECS"),
                    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                ),
            },
            database: DatabaseConfig {
                url,
                max_connections: parsed(
                    lookup("DATABASE_MAX_CONNECTIONS"),
                    DEFAULT_DATABASE_MAX_CONNECTIONS,
                ),
                min_connections: parsed(
                    lookup("DATABASE_MIN_CONNECTIONS"),
                    DEFAULT_DATABASE_MIN_CONNECTIONS,
                ),
                connect_timeout_secs: parsed(
                    lookup("DATABASE_CONNECT_TIMEOUT_SECS"),
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                ),
            },
            cors: CorsConfig {
                allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|| DEFAULT_CORS_ALLOWED_ORIGIN.to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                allow_credentials: parsed(lookup("CORS_ALLOW_CREDENTIALS"), false),
            },
            allocation: AllocationConfig {
                max_attempts: parsed(
                    lookup("TRANCHE_ALLOCATION_MAX_ATTEMPTS"),
                    DEFAULT_MAX_ATTEMPTS,
                ),
                backoff_ms: parsed(lookup("TRANCHE_ALLOCATION_BACKOFF_MS"), DEFAULT_BACKOFF_MS),
            },
            admin: AdminConfig {
                password_sha256: lookup("TRANCHE_ADMIN_PASSWORD_SHA256")
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty()),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if self.allocation.max_attempts == 0 {
            anyhow::bail!("TRANCHE_ALLOCATION_MAX_ATTEMPTS must be at least 1");
        }

        match &self.admin.password_sha256 {
            Some(digest) if !auth::is_valid_digest(digest) => {
                anyhow::bail!("TRANCHE_ADMIN_PASSWORD_SHA256 must be a 64 character hex digest");
            },
            None => {
                tracing::warn!("No admin password configured - destructive admin actions are disabled");
            },
            _ => {},
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_apply() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://db/tranche")]))
            .unwrap();
        assert_eq!(config.server.port, DEFAULT_SERVER_PORT);
        assert_eq!(config.allocation.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(config.cors.allowed_origins, vec!["*".to_string()]);
        assert!(config.admin.password_sha256.is_none());
    }

    #[test]
    fn test_database_url_is_required() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
    }

    #[test]
    fn test_invalid_pool_bounds_are_rejected() {
        let result = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/tranche"),
            ("DATABASE_MIN_CONNECTIONS", "20"),
            ("DATABASE_MAX_CONNECTIONS", "5"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_admin_digest_is_validated() {
        let bad = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/tranche"),
            ("TRANCHE_ADMIN_PASSWORD_SHA256", "not-a-digest"),
        ]));
        assert!(bad.is_err());

        let digest = auth::hash_password("secret").to_uppercase();
        let good = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/tranche"),
            ("TRANCHE_ADMIN_PASSWORD_SHA256", digest.as_str()),
        ]))
        .unwrap();
        assert_eq!(good.admin.password_sha256, Some(auth::hash_password("secret")));
        assert!(!format!("{:?}", good.admin).contains(&auth::hash_password("secret")));
    }

    #[test]
    fn test_retry_policy_conversion() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/tranche"),
            ("TRANCHE_ALLOCATION_MAX_ATTEMPTS", "7"),
            ("TRANCHE_ALLOCATION_BACKOFF_MS", "20"),
        ]))
        .unwrap();
        let policy = config.allocation.retry_policy();
        assert_eq!(policy.max_attempts, 7);
        assert_eq!(policy.backoff, Duration::from_millis(20));
    }
}
