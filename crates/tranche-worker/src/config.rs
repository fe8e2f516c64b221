//! Worker configuration
//!
//! Settings live in `~/.config/tranche/config.toml` and can be overridden by
//! environment variables (`TRANCHE_SERVER_URL`, `TRANCHE_CACHE_DIR`,
//! `TRANCHE_WORKER_ID`, `TRANCHE_REGION`, `TRANCHE_DATASET`,
//! `TRANCHE_ADMIN_PASSWORD_SHA256`, `TRANCHE_POLL_INTERVAL_SECS`).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tranche_common::auth;

use crate::error::{Result, WorkerError};
use crate::session::Session;

// ============================================================================
// Worker Configuration Constants
// ============================================================================

/// Default server URL when none is configured.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Default seconds between override signal polls.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// File name of the SQLite cache inside `cache_dir`.
pub const CACHE_DB_FILE: &str = "cache.db";

/// Keys accepted by `tranche config get|set`.
pub const KEYS: &[&str] = &[
    "server_url",
    "cache_dir",
    "worker_id",
    "region",
    "dataset_name",
    "admin_password_sha256",
    "poll_interval_secs",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server_url: String,
    pub cache_dir: PathBuf,
    pub worker_id: Option<String>,
    pub region: Option<String>,
    pub dataset_name: Option<String>,
    /// Hex SHA-256 of the password that unlocks local destructive actions.
    pub admin_password_sha256: Option<String>,
    pub poll_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .map(|dir| dir.join("tranche"))
            .unwrap_or_else(|| PathBuf::from(".tranche-cache"));
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            cache_dir,
            worker_id: None,
            region: None,
            dataset_name: None,
            admin_password_sha256: None,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

impl Config {
    /// `~/.config/tranche/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .ok_or_else(|| WorkerError::config("Could not determine config directory"))?
            .join("tranche")
            .join("config.toml"))
    }

    /// Load the config file (if any) and apply environment overrides.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::load_from(&Self::default_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Read a config file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            WorkerError::config(format!("Invalid config file '{}': {}", path.display(), e))
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| WorkerError::config(format!("Cannot serialize config: {e}")))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Apply `TRANCHE_*` overrides from any key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        for key in KEYS {
            let var = format!("TRANCHE_{}", env_suffix(key));
            if let Some(value) = lookup(&var) {
                self.set(key, &value)?;
            }
        }
        Ok(())
    }

    /// Current value of `key` as text (empty when unset).
    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "server_url" => self.server_url.clone(),
            "cache_dir" => self.cache_dir.display().to_string(),
            "worker_id" => self.worker_id.clone().unwrap_or_default(),
            "region" => self.region.clone().unwrap_or_default(),
            "dataset_name" => self.dataset_name.clone().unwrap_or_default(),
            "admin_password_sha256" => self
                .admin_password_sha256
                .as_ref()
                .map(|_| "<set>".to_string())
                .unwrap_or_default(),
            "poll_interval_secs" => self.poll_interval_secs.to_string(),
            other => return Err(unknown_key(other)),
        };
        Ok(value)
    }

    /// Set `key` from text. An empty value clears optional settings.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        let optional = || (!value.is_empty()).then(|| value.to_string());
        match key {
            "server_url" => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    return Err(WorkerError::config(format!(
                        "server_url must start with http:// or https://, got '{value}'"
                    )));
                }
                self.server_url = value.trim_end_matches('/').to_string();
            },
            "cache_dir" => self.cache_dir = PathBuf::from(value),
            "worker_id" => self.worker_id = optional(),
            "region" => self.region = optional(),
            "dataset_name" => self.dataset_name = optional(),
            "admin_password_sha256" => {
                if !value.is_empty() && !auth::is_valid_digest(value) {
                    return Err(WorkerError::config(
                        "admin_password_sha256 must be a 64 character hex digest",
                    ));
                }
                self.admin_password_sha256 = optional().map(|v| v.to_lowercase());
            },
            "poll_interval_secs" => {
                self.poll_interval_secs = value
                    .parse()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or_else(|| {
                        WorkerError::config(format!(
                            "poll_interval_secs must be a positive integer, got '{value}'"
                        ))
                    })?;
            },
            other => return Err(unknown_key(other)),
        }
        Ok(())
    }

    /// Identity of this worker; fails when any part is missing.
    pub fn session(&self) -> Result<Session> {
        fn required(value: &Option<String>, key: &str) -> Result<String> {
            value.clone().ok_or_else(|| {
                WorkerError::config(format!("'{key}' is not set (tranche config set {key} <value>)"))
            })
        }
        Ok(Session {
            worker_id: required(&self.worker_id, "worker_id")?,
            region: required(&self.region, "region")?,
            dataset_name: required(&self.dataset_name, "dataset_name")?,
        })
    }

    pub fn cache_db_path(&self) -> PathBuf {
        self.cache_dir.join(CACHE_DB_FILE)
    }
}

fn env_suffix(key: &str) -> String {
    match key {
        "dataset_name" => "DATASET".to_string(),
        other => other.to_uppercase(),
    }
}

fn unknown_key(key: &str) -> WorkerError {
    WorkerError::config(format!(
        "Unknown config key '{}'. Known keys: {}",
        key,
        KEYS.join(", ")
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert_eq!(config.poll_interval_secs, DEFAULT_POLL_INTERVAL_SECS);
        assert!(config.session().is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.set("worker_id", "w1").unwrap();
        config.set("region", "ahilyanagar").unwrap();
        config.set("dataset_name", "survey.csv").unwrap();
        config.set("server_url", "https://tranche.example.org/").unwrap();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.server_url, "https://tranche.example.org");
        assert_eq!(loaded.session().unwrap().worker_id, "w1");
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("TRANCHE_WORKER_ID", "w9"),
            ("TRANCHE_DATASET", "round-2.csv"),
            ("TRANCHE_POLL_INTERVAL_SECS", "3"),
        ]
        .into();
        let mut config = Config::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.worker_id.as_deref(), Some("w9"));
        assert_eq!(config.dataset_name.as_deref(), Some("round-2.csv"));
        assert_eq!(config.poll_interval_secs, 3);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = Config::default();
        assert!(config.set("server_url", "localhost:8000").is_err());
        assert!(config.set("poll_interval_secs", "0").is_err());
        assert!(config.set("admin_password_sha256", "abc").is_err());
        assert!(config.set("colour", "blue").is_err());
        assert!(config.get("colour").is_err());
    }

    #[test]
    fn test_digest_is_masked() {
        let mut config = Config::default();
        config
            .set("admin_password_sha256", &auth::hash_password("secret"))
            .unwrap();
        assert_eq!(config.get("admin_password_sha256").unwrap(), "<set>");
    }
}
