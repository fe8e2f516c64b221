//! API request and response types
//!
//! Mirrors the server's JSON bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tranche_common::types::{ActiveBundle, ActiveBundles, FieldMap};

/// Standard success envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

/// Error envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocateResponse {
    pub region: String,
    pub sub_region: String,
    pub bundle_number: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecycleRequest {
    pub bundle_number: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecycleResponse {
    pub bundle_number: u32,
    pub recycled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStateView {
    pub worker_id: String,
    pub active_bundles: ActiveBundles,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovedResponse {
    pub removed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountUpdateRequest {
    pub bundle_number: u32,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountUpdateResponse {
    pub updated: bool,
    pub active_bundle: Option<ActiveBundle>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearedResponse {
    pub removed_bundles: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcknowledgedResponse {
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteRecordResponse {
    pub unique_id: String,
    pub bundle_number: u32,
}

// ============================================================================
// Administration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerBundleTarget {
    pub worker_id: String,
    pub sub_region: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualAssignRequest {
    pub worker_id: String,
    pub sub_region: String,
    pub bundle_number: u32,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct PasswordRequest {
    pub password: String,
}

impl std::fmt::Debug for PasswordRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordRequest")
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetProgressResponse {
    pub worker_id: String,
    pub sub_region: String,
    pub bundle_number: u32,
    pub deleted_records: u64,
    pub recycled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForceCompleteResponse {
    pub region: String,
    pub sub_region: String,
    pub bundle_number: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualAssignResponse {
    pub worker_id: String,
    pub active_bundle: ActiveBundle,
    pub counter_adjusted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseResponse {
    pub worker_id: String,
    pub sub_region: String,
    pub bundle_number: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurgeRecordsResponse {
    pub deleted_records: u64,
    pub deleted_flags: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetCountersResponse {
    pub deleted_counters: u64,
    pub deleted_active_bundles: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterView {
    pub region: String,
    pub sub_region: String,
    pub next_bundle_number: u32,
    pub gaps: Vec<u32>,
    pub next_to_assign: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadDatasetRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<i64>,
    pub rows: Vec<FieldMap>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedRecord {
    pub sub_region: String,
    pub bundle_number: u32,
    pub unique_id: String,
    pub fields: FieldMap,
    pub processed_by: String,
    pub processed_by_name: Option<String>,
    pub processed_by_mobile: Option<String>,
    pub processed_at: DateTime<Utc>,
    pub source_dataset_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub username: String,
    pub mobile: String,
    pub region: String,
    pub dataset_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub username: String,
    pub mobile: String,
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_name: Option<String>,
}

/// Only the fields that are set are changed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedUserResponse {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetProgress {
    pub region: String,
    pub name: String,
    pub total_records: i64,
    pub processed_records: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleProgress {
    pub region: String,
    pub sub_region: String,
    pub bundle_number: u32,
    pub record_count: i64,
    pub is_force_completed: bool,
    pub is_complete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub datasets: Vec<DatasetProgress>,
    pub bundles: Vec<BundleProgress>,
    pub total_processed: i64,
    pub completed_bundles: usize,
}
