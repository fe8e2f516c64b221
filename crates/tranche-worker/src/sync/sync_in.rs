use chrono::Utc;
use serde::Serialize;
use tranche_common::types::SourceRow;
use tracing::{info, warn};

use crate::cache::{LocalCache, SyncState};
use crate::error::{Result, WorkerError};
use crate::progress::ProgressReporter;
use crate::remote::RemoteStore;
use crate::session::Session;

/// Rows inserted per cache transaction before yielding.
pub const SYNC_IN_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncInReport {
    pub dataset_id: String,
    pub dataset_name: String,
    pub total_rows: u64,
    pub inserted: u64,
    /// Rows already cached for this dataset.
    pub duplicates: u64,
    /// Rows with a blank record id cell.
    pub missing_record_id: u64,
}

/// Import the session's assigned dataset into the local cache.
///
/// Rows already cached under the same `(dataset_id, record_id)` are left as
/// they are, so running this again never duplicates or resets work.
#[tracing::instrument(skip(cache, remote, session, progress), fields(dataset = %session.dataset_name))]
pub async fn sync_in<R>(
    cache: &LocalCache,
    remote: &R,
    session: &Session,
    progress: &dyn ProgressReporter,
) -> Result<SyncInReport>
where
    R: RemoteStore + ?Sized,
{
    let dataset = remote
        .dataset_by_name(&session.region, &session.dataset_name)
        .await?
        .ok_or_else(|| WorkerError::DatasetNotFound {
            region: session.region.clone(),
            name: session.dataset_name.clone(),
        })?;

    if dataset.rows.is_empty() {
        return Err(WorkerError::NoRecords(format!(
            "dataset '{}' has no rows",
            dataset.summary.name
        )));
    }
    let id_column = dataset
        .record_id_column()
        .ok_or_else(|| WorkerError::MissingRecordIdColumn(dataset.summary.name.clone()))?;

    let mut report = SyncInReport {
        dataset_id: dataset.summary.id.clone(),
        dataset_name: dataset.summary.name.clone(),
        total_rows: dataset.rows.len() as u64,
        ..Default::default()
    };
    progress.start(report.total_rows, "Importing records");

    for chunk in dataset.rows.chunks(SYNC_IN_BATCH_SIZE) {
        let mut batch = Vec::with_capacity(chunk.len());
        for fields in chunk {
            match SourceRow::from_fields(fields.clone(), &id_column) {
                Some(row) => batch.push(row),
                None => {
                    report.missing_record_id += 1;
                    warn!(column = %id_column, "Skipping row without a record id");
                },
            }
        }

        let inserted = cache
            .insert_rows(&report.dataset_id, &report.dataset_name, &batch)
            .await?;
        report.inserted += inserted;
        report.duplicates += batch.len() as u64 - inserted;

        progress.advance(chunk.len() as u64);
        tokio::task::yield_now().await;
    }

    cache
        .set_sync_state(&SyncState {
            dataset_id: report.dataset_id.clone(),
            dataset_name: report.dataset_name.clone(),
            region: session.region.clone(),
            row_count: report.total_rows as i64,
            synced_at: Utc::now(),
        })
        .await?;

    progress.finish("Import complete");
    info!(
        inserted = report.inserted,
        duplicates = report.duplicates,
        missing_record_id = report.missing_record_id,
        "Sync-in finished"
    );
    Ok(report)
}
