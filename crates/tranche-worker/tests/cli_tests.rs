//! End-to-end tests for the tranche binary
//!
//! Each test runs with its own config and cache directories so nothing
//! touches the real user configuration.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

const ENV_KEYS: &[&str] = &[
    "TRANCHE_SERVER_URL",
    "TRANCHE_CACHE_DIR",
    "TRANCHE_WORKER_ID",
    "TRANCHE_REGION",
    "TRANCHE_DATASET",
    "TRANCHE_ADMIN_PASSWORD",
    "TRANCHE_ADMIN_PASSWORD_SHA256",
    "TRANCHE_POLL_INTERVAL_SECS",
];

/// `tranche` with HOME and XDG directories pointed into `home`.
fn tranche(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tranche").expect("binary builds");
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("XDG_CACHE_HOME", home.path().join("cache"))
        .env("NO_COLOR", "1");
    for key in ENV_KEYS {
        cmd.env_remove(key);
    }
    cmd
}

#[test]
fn test_help_lists_worker_commands() {
    let home = TempDir::new().expect("tempdir");
    tranche(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sync-in"))
        .stdout(predicate::str::contains("sync-out"))
        .stdout(predicate::str::contains("bundle"))
        .stdout(predicate::str::contains("admin"));
}

#[test]
fn test_config_set_then_get() {
    let home = TempDir::new().expect("tempdir");

    tranche(&home)
        .args(["config", "set", "worker_id", "w-17"])
        .assert()
        .success()
        .stdout(predicate::str::contains("worker_id updated"));

    tranche(&home)
        .args(["config", "get", "worker_id"])
        .assert()
        .success()
        .stdout(predicate::str::diff("w-17\n"));
}

#[test]
fn test_config_rejects_bad_values() {
    let home = TempDir::new().expect("tempdir");

    tranche(&home)
        .args(["config", "set", "poll_interval_secs", "soon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("poll_interval_secs"));

    tranche(&home)
        .args(["config", "set", "colour", "blue"])
        .assert()
        .failure();
}

#[test]
fn test_worker_command_needs_identity() {
    let home = TempDir::new().expect("tempdir");
    tranche(&home)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("worker_id"));
}

#[test]
fn test_reset_processed_needs_configured_password() {
    let home = TempDir::new().expect("tempdir");
    tranche(&home)
        .args(["reset-processed", "--password", "anything"])
        .env("TRANCHE_WORKER_ID", "w1")
        .env("TRANCHE_REGION", "ahilyanagar")
        .env("TRANCHE_DATASET", "survey.csv")
        .env("TRANCHE_SERVER_URL", "http://127.0.0.1:9")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not authorized"));
}

#[tokio::test]
async fn test_sync_in_fills_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/datasets/ahilyanagar/by-name/survey.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "id": "ds-1",
                "region": "ahilyanagar",
                "name": "survey.csv",
                "size_bytes": 128,
                "record_count": 2,
                "uploaded_at": "2026-03-01T09:00:00Z",
                "rows": [
                    { "Search from": "R-1", "Taluka": "Sillod" },
                    { "Search from": "R-2", "Taluka": "Kannad" }
                ]
            }
        })))
        .mount(&server)
        .await;

    let home = TempDir::new().expect("tempdir");
    let cache_dir = home.path().join("worker-cache");
    let configure = |cmd: &mut Command| {
        cmd.env("TRANCHE_SERVER_URL", server.uri())
            .env("TRANCHE_CACHE_DIR", &cache_dir)
            .env("TRANCHE_WORKER_ID", "w1")
            .env("TRANCHE_REGION", "ahilyanagar")
            .env("TRANCHE_DATASET", "survey.csv");
    };

    let mut cmd = tranche(&home);
    configure(&mut cmd);
    cmd.arg("sync-in")
        .assert()
        .success()
        .stdout(predicate::str::contains("new records:"))
        .stdout(predicate::str::contains("2"));
    assert!(cache_dir.join("cache.db").exists());

    let mut cmd = tranche(&home);
    configure(&mut cmd);
    cmd.args(["lookup", "R-2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Kannad"));
}
