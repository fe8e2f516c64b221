//! HTTP client tests against a mock tranche server
//!
//! These tests validate:
//! - Envelope unwrapping for the worker endpoints
//! - Mapping of server error codes to worker errors
//! - Missing datasets reported as absent rather than failed

#![allow(clippy::unwrap_used)]

use serde_json::json;
use tranche_common::types::{ActiveBundle, SignalKind};
use tranche_worker::api::ApiClient;
use tranche_worker::remote::RemoteStore;
use tranche_worker::WorkerError;
use wiremock::{
    matchers::{body_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": data }))
}

fn error(status: u16, code: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "success": false,
        "error": { "code": code, "message": message }
    }))
}

// ============================================================================
// Counter Service
// ============================================================================

#[tokio::test]
async fn test_allocate_returns_bundle_number() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/bundle-counters/ahilyanagar/Sillod/allocate"))
        .respond_with(ok(json!({
            "region": "ahilyanagar",
            "sub_region": "Sillod",
            "bundle_number": 4
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri()).unwrap();
    assert_eq!(client.allocate_bundle("ahilyanagar", "Sillod").await.unwrap(), 4);
}

#[tokio::test]
async fn test_recycle_sends_bundle_number() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/bundle-counters/ahilyanagar/Sillod/recycle"))
        .and(body_json(json!({ "bundle_number": 3 })))
        .respond_with(ok(json!({ "bundle_number": 3, "recycled": true })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri()).unwrap();
    assert!(client.recycle_bundle("ahilyanagar", "Sillod", 3).await.unwrap());
}

#[tokio::test]
async fn test_allocation_conflict_is_distinguished() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/bundle-counters/ahilyanagar/Sillod/allocate"))
        .respond_with(error(409, "ALLOCATION_CONFLICT", "gave up after 25 attempts"))
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri()).unwrap();
    let err = client.allocate_bundle("ahilyanagar", "Sillod").await.unwrap_err();
    assert!(matches!(err, WorkerError::AllocationConflict(_)));
}

#[tokio::test]
async fn test_server_failure_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/bundle-counters/ahilyanagar/Sillod/allocate"))
        .respond_with(error(500, "DATABASE_ERROR", "connection refused"))
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri()).unwrap();
    let err = client.allocate_bundle("ahilyanagar", "Sillod").await.unwrap_err();
    assert!(matches!(err, WorkerError::RemoteUnavailable(_)));
}

// ============================================================================
// User State and Signals
// ============================================================================

#[tokio::test]
async fn test_active_bundles_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/user-states/w1"))
        .respond_with(ok(json!({
            "worker_id": "w1",
            "active_bundles": {
                "Sillod": { "sub_region": "Sillod", "bundle_number": 2, "count": 17 }
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/user-states/w1/active-bundles/Kannad"))
        .and(body_json(json!({ "sub_region": "Kannad", "bundle_number": 1, "count": 0 })))
        .respond_with(ok(json!({ "sub_region": "Kannad", "bundle_number": 1, "count": 0 })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri()).unwrap();
    let bundles = client.active_bundles("w1").await.unwrap();
    assert_eq!(bundles["Sillod"].count, 17);

    client
        .put_active_bundle("w1", &ActiveBundle::new("Kannad", 1))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_count_update_reports_withdrawn_bundle() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/v1/user-states/w1/active-bundles/Sillod"))
        .and(body_json(json!({ "bundle_number": 2, "count": 18 })))
        .respond_with(ok(json!({ "updated": false, "active_bundle": null })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri()).unwrap();
    let mut bundle = ActiveBundle::new("Sillod", 2);
    bundle.count = 18;
    assert!(!client.update_bundle_count("w1", &bundle).await.unwrap());
}

#[tokio::test]
async fn test_signals_are_decoded_and_acknowledged() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/signals/w1"))
        .respond_with(ok(json!({
            "Paithan": { "type": "reset", "issued_at": "2026-03-01T10:00:00Z" },
            "Sillod": { "type": "manual_assign", "bundle_number": 6, "issued_at": "2026-03-01T10:05:00Z" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/signals/w1/Paithan"))
        .respond_with(ok(json!({ "deleted": true })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri()).unwrap();
    let signals = client.signals("w1").await.unwrap();
    assert_eq!(signals["Paithan"].kind, SignalKind::Reset);
    assert_eq!(signals["Sillod"].kind, SignalKind::ManualAssign { bundle_number: 6 });
    assert!(client.acknowledge_signal("w1", "Paithan").await.unwrap());
}

// ============================================================================
// Datasets
// ============================================================================

#[tokio::test]
async fn test_missing_dataset_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/datasets/ahilyanagar/by-name/survey.csv"))
        .respond_with(error(404, "NOT_FOUND", "dataset not found"))
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri()).unwrap();
    assert!(client
        .dataset_by_name("ahilyanagar", "survey.csv")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_dataset_rows_are_returned() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/datasets/ahilyanagar/by-name/survey.csv"))
        .respond_with(ok(json!({
            "id": "ds-1",
            "region": "ahilyanagar",
            "name": "survey.csv",
            "size_bytes": 64,
            "record_count": 1,
            "uploaded_at": "2026-03-01T09:00:00Z",
            "rows": [{ "Search from ": "R-1", "Taluka": "Sillod" }]
        })))
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri()).unwrap();
    let dataset = client
        .dataset_by_name("ahilyanagar", "survey.csv")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(dataset.summary.id, "ds-1");
    assert_eq!(dataset.rows.len(), 1);
    assert_eq!(dataset.record_id_column().as_deref(), Some("Search from "));
}

// ============================================================================
// Administration
// ============================================================================

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/admin/reset-counters"))
        .and(body_json(json!({ "password": "guess" })))
        .respond_with(error(401, "UNAUTHORIZED", "invalid admin password"))
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri()).unwrap();
    let err = client.reset_counters("guess").await.unwrap_err();
    assert!(matches!(err, WorkerError::Unauthorized(_)));
}

#[tokio::test]
async fn test_unknown_error_code_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/admin/force-complete"))
        .respond_with(error(404, "NOT_FOUND", "no active bundle"))
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri()).unwrap();
    let err = client.force_complete("w1", "Sillod").await.unwrap_err();
    match err {
        WorkerError::Api { code, message } => {
            assert_eq!(code, "NOT_FOUND");
            assert_eq!(message, "no active bundle");
        },
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_health_check_reports_unreachable_server() {
    let client = ApiClient::new("http://127.0.0.1:9").unwrap();
    assert!(!client.health_check().await.unwrap());
}
