//! HTTP API client for the tranche server
//!
//! Implements [`RemoteStore`] for the worker protocols and exposes the
//! administrative endpoints used by `tranche admin`.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tranche_common::types::{
    ActiveBundle, ActiveBundles, Dataset, DatasetSummary, ProcessedRecord,
};

use crate::api::{endpoints, types::*};
use crate::error::{Result, WorkerError};
use crate::remote::{RemoteStore, Signals};

// ============================================================================
// API Client Constants
// ============================================================================

/// Default timeout for API requests in seconds.
/// Can be overridden via TRANCHE_API_TIMEOUT_SECS. Dataset uploads and
/// downloads are large, hence the generous default.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 120;

/// API client for the tranche server
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let timeout_secs = std::env::var("TRANCHE_API_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_API_TIMEOUT_SECS);

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check server health
    pub async fn health_check(&self) -> Result<bool> {
        let url = endpoints::health_url(&self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        read_response(response).await
    }

    // ------------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------------

    pub async fn reset_progress(&self, worker_id: &str, sub_region: &str) -> Result<ResetProgressResponse> {
        let url = endpoints::admin_url(&self.base_url, "reset-progress");
        self.send(self.client.post(&url).json(&target(worker_id, sub_region)))
            .await
    }

    pub async fn force_complete(&self, worker_id: &str, sub_region: &str) -> Result<ForceCompleteResponse> {
        let url = endpoints::admin_url(&self.base_url, "force-complete");
        self.send(self.client.post(&url).json(&target(worker_id, sub_region)))
            .await
    }

    pub async fn manual_assign(
        &self,
        worker_id: &str,
        sub_region: &str,
        bundle_number: u32,
    ) -> Result<ManualAssignResponse> {
        let url = endpoints::admin_url(&self.base_url, "manual-assign");
        let request = ManualAssignRequest {
            worker_id: worker_id.to_string(),
            sub_region: sub_region.to_string(),
            bundle_number,
        };
        self.send(self.client.post(&url).json(&request)).await
    }

    pub async fn release(&self, worker_id: &str, sub_region: &str) -> Result<ReleaseResponse> {
        let url = endpoints::admin_url(&self.base_url, "release");
        self.send(self.client.post(&url).json(&target(worker_id, sub_region)))
            .await
    }

    pub async fn purge_processed_records(&self, password: &str) -> Result<PurgeRecordsResponse> {
        let url = endpoints::admin_url(&self.base_url, "purge-processed-records");
        self.send(self.client.post(&url).json(&password_request(password)))
            .await
    }

    pub async fn reset_counters(&self, password: &str) -> Result<ResetCountersResponse> {
        let url = endpoints::admin_url(&self.base_url, "reset-counters");
        self.send(self.client.post(&url).json(&password_request(password)))
            .await
    }

    pub async fn counters(&self, region: Option<&str>) -> Result<Vec<CounterView>> {
        let url = endpoints::counters_url(&self.base_url, region);
        self.send(self.client.get(&url)).await
    }

    pub async fn upload_dataset(&self, region: &str, request: &UploadDatasetRequest) -> Result<DatasetSummary> {
        let url = endpoints::datasets_url(&self.base_url, region);
        self.send(self.client.post(&url).json(request)).await
    }

    pub async fn list_datasets(&self, region: &str) -> Result<Vec<DatasetSummary>> {
        let url = endpoints::datasets_url(&self.base_url, region);
        self.send(self.client.get(&url)).await
    }

    pub async fn delete_dataset(&self, region: &str, id: &str) -> Result<()> {
        let url = endpoints::dataset_url(&self.base_url, region, id);
        let _: serde_json::Value = self.send(self.client.delete(&url)).await?;
        Ok(())
    }

    pub async fn export_records(&self, region: &str) -> Result<Vec<ExportedRecord>> {
        let url = endpoints::export_url(&self.base_url, region);
        self.send(self.client.get(&url)).await
    }

    pub async fn list_users(&self, region: Option<&str>) -> Result<Vec<User>> {
        let url = endpoints::users_url(&self.base_url, region);
        self.send(self.client.get(&url)).await
    }

    pub async fn get_user(&self, id: &str) -> Result<User> {
        let url = endpoints::user_url(&self.base_url, id);
        self.send(self.client.get(&url)).await
    }

    pub async fn create_user(&self, request: &CreateUserRequest) -> Result<User> {
        let url = endpoints::users_url(&self.base_url, None);
        self.send(self.client.post(&url).json(request)).await
    }

    pub async fn update_user(&self, id: &str, request: &UpdateUserRequest) -> Result<User> {
        let url = endpoints::user_url(&self.base_url, id);
        self.send(self.client.put(&url).json(request)).await
    }

    pub async fn delete_user(&self, id: &str) -> Result<DeletedUserResponse> {
        let url = endpoints::user_url(&self.base_url, id);
        self.send(self.client.delete(&url)).await
    }

    pub async fn summary(&self, region: Option<&str>) -> Result<AnalyticsSummary> {
        let url = endpoints::summary_url(&self.base_url, region);
        self.send(self.client.get(&url)).await
    }
}

fn target(worker_id: &str, sub_region: &str) -> WorkerBundleTarget {
    WorkerBundleTarget {
        worker_id: worker_id.to_string(),
        sub_region: sub_region.to_string(),
    }
}

fn password_request(password: &str) -> PasswordRequest {
    PasswordRequest {
        password: password.to_string(),
    }
}

/// Unwrap the success envelope or turn the error envelope into a
/// [`WorkerError`].
async fn read_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        let body: ApiResponse<T> = response.json().await?;
        return Ok(body.data);
    }

    let text = response.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => (body.error.code, body.error.message),
        Err(_) => (status.as_str().to_string(), text),
    };
    tracing::debug!(%status, %code, %message, "Server returned an error");
    Err(classify(status, code, message))
}

fn classify(status: StatusCode, code: String, message: String) -> WorkerError {
    match code.as_str() {
        "ALLOCATION_CONFLICT" => WorkerError::AllocationConflict(message),
        "UNAUTHORIZED" => WorkerError::Unauthorized(message),
        _ if status.is_server_error() => {
            WorkerError::RemoteUnavailable(format!("server error {status}: {message}"))
        },
        _ => WorkerError::Api { code, message },
    }
}

#[async_trait]
impl RemoteStore for ApiClient {
    async fn allocate_bundle(&self, region: &str, sub_region: &str) -> Result<u32> {
        let url = endpoints::allocate_url(&self.base_url, region, sub_region);
        let response: AllocateResponse = self.send(self.client.post(&url)).await?;
        Ok(response.bundle_number)
    }

    async fn recycle_bundle(&self, region: &str, sub_region: &str, bundle_number: u32) -> Result<bool> {
        let url = endpoints::recycle_url(&self.base_url, region, sub_region);
        let response: RecycleResponse = self
            .send(self.client.post(&url).json(&RecycleRequest { bundle_number }))
            .await?;
        Ok(response.recycled)
    }

    async fn active_bundles(&self, worker_id: &str) -> Result<ActiveBundles> {
        let url = endpoints::user_state_url(&self.base_url, worker_id);
        let view: UserStateView = self.send(self.client.get(&url)).await?;
        Ok(view.active_bundles)
    }

    async fn put_active_bundle(&self, worker_id: &str, bundle: &ActiveBundle) -> Result<()> {
        let url = endpoints::active_bundle_url(&self.base_url, worker_id, &bundle.sub_region);
        let _: ActiveBundle = self.send(self.client.put(&url).json(bundle)).await?;
        Ok(())
    }

    async fn update_bundle_count(&self, worker_id: &str, bundle: &ActiveBundle) -> Result<bool> {
        let url = endpoints::active_bundle_url(&self.base_url, worker_id, &bundle.sub_region);
        let request = CountUpdateRequest {
            bundle_number: bundle.bundle_number,
            count: bundle.count,
        };
        let response: CountUpdateResponse = self.send(self.client.patch(&url).json(&request)).await?;
        Ok(response.updated)
    }

    async fn remove_active_bundle(&self, worker_id: &str, sub_region: &str) -> Result<bool> {
        let url = endpoints::active_bundle_url(&self.base_url, worker_id, sub_region);
        let response: RemovedResponse = self.send(self.client.delete(&url)).await?;
        Ok(response.removed)
    }

    async fn clear_user_state(&self, worker_id: &str) -> Result<u64> {
        let url = endpoints::user_state_url(&self.base_url, worker_id);
        let response: ClearedResponse = self.send(self.client.delete(&url)).await?;
        Ok(response.removed_bundles)
    }

    async fn signals(&self, worker_id: &str) -> Result<Signals> {
        let url = endpoints::signals_url(&self.base_url, worker_id);
        self.send(self.client.get(&url)).await
    }

    async fn acknowledge_signal(&self, worker_id: &str, sub_region: &str) -> Result<bool> {
        let url = endpoints::signal_url(&self.base_url, worker_id, sub_region);
        let response: AcknowledgedResponse = self.send(self.client.delete(&url)).await?;
        Ok(response.deleted)
    }

    async fn dataset_by_name(&self, region: &str, name: &str) -> Result<Option<Dataset>> {
        let url = endpoints::dataset_by_name_url(&self.base_url, region, name);
        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        read_response(response).await.map(Some)
    }

    async fn write_processed_record(&self, record: &ProcessedRecord) -> Result<()> {
        let url = endpoints::processed_record_url(
            &self.base_url,
            &record.region,
            &record.sub_region,
            record.bundle_number,
            &record.unique_id,
        );
        let _: WriteRecordResponse = self.send(self.client.put(&url).json(record)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_map_to_worker_errors() {
        let err = classify(StatusCode::CONFLICT, "ALLOCATION_CONFLICT".into(), "busy".into());
        assert!(matches!(err, WorkerError::AllocationConflict(_)));

        let err = classify(StatusCode::UNAUTHORIZED, "UNAUTHORIZED".into(), "nope".into());
        assert!(matches!(err, WorkerError::Unauthorized(_)));

        let err = classify(StatusCode::BAD_GATEWAY, "502".into(), "".into());
        assert!(matches!(err, WorkerError::RemoteUnavailable(_)));

        let err = classify(StatusCode::CONFLICT, "CONFLICT".into(), "taken".into());
        assert!(matches!(err, WorkerError::Api { ref code, .. } if code == "CONFLICT"));
    }
}
