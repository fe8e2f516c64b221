//! Local record cache
//!
//! SQLite holds the rows of the assigned dataset, each with its processing
//! state, plus this worker's copy of its active bundles. Everything a worker
//! does offline happens here; the remote store only sees the results.

mod bundles;
mod entries;

pub use bundles::merge_active_bundles;
pub use entries::{CacheEntry, CommittedRecord};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tranche_common::types::RecordStatus;

use crate::error::{Result, WorkerError};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// The dataset this cache was last filled from.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct SyncState {
    pub dataset_id: String,
    pub dataset_name: String,
    pub region: String,
    pub row_count: i64,
    pub synced_at: DateTime<Utc>,
}

/// Number of cached entries per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: i64,
    pub processed: i64,
    pub synced: i64,
}

impl StatusCounts {
    pub fn total(&self) -> i64 {
        self.pending + self.processed + self.synced
    }
}

/// What `purge` removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub entries: u64,
    pub active_bundles: u64,
}

/// Handle to the worker's SQLite cache.
#[derive(Debug, Clone)]
pub struct LocalCache {
    pool: SqlitePool,
}

impl LocalCache {
    /// Open (creating if needed) the cache database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    /// A private in-memory cache. One connection, since every SQLite memory
    /// connection is its own database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        MIGRATOR.run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn sync_state(&self) -> Result<Option<SyncState>> {
        let state = sqlx::query_as::<_, SyncState>(
            r#"
            SELECT dataset_id, dataset_name, region, row_count, synced_at
            FROM sync_state WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(state)
    }

    pub async fn set_sync_state(&self, state: &SyncState) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sync_state (id, dataset_id, dataset_name, region, row_count, synced_at)
            VALUES (1, ?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                dataset_id = excluded.dataset_id,
                dataset_name = excluded.dataset_name,
                region = excluded.region,
                row_count = excluded.row_count,
                synced_at = excluded.synced_at
            "#,
        )
        .bind(&state.dataset_id)
        .bind(&state.dataset_name)
        .bind(&state.region)
        .bind(state.row_count)
        .bind(state.synced_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn status_counts(&self) -> Result<StatusCounts> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS n FROM cache_entries GROUP BY status")
            .fetch_all(&self.pool)
            .await?;

        let mut counts = StatusCounts::default();
        for row in rows {
            let status: String = row.get("status");
            let n: i64 = row.get("n");
            match parse_status(&status)? {
                RecordStatus::Pending => counts.pending = n,
                RecordStatus::Processed => counts.processed = n,
                RecordStatus::Synced => counts.synced = n,
            }
        }
        Ok(counts)
    }

    /// Delete every entry, every active bundle and the sync state.
    pub async fn purge(&self) -> Result<PurgeReport> {
        let mut tx = self.pool.begin().await?;
        let entries = sqlx::query("DELETE FROM cache_entries")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let active_bundles = sqlx::query("DELETE FROM active_bundles")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM sync_state").execute(&mut *tx).await?;
        tx.commit().await?;

        tracing::info!(entries, active_bundles, "Purged local cache");
        Ok(PurgeReport {
            entries,
            active_bundles,
        })
    }
}

fn parse_status(status: &str) -> Result<RecordStatus> {
    RecordStatus::from_str(status).map_err(|e| WorkerError::cache(e.to_string()))
}

fn to_u32(value: i64, column: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| WorkerError::cache(format!("{column} out of range in local cache: {value}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_sync_state_upserts_single_row() {
        let cache = LocalCache::in_memory().await.unwrap();
        assert!(cache.sync_state().await.unwrap().is_none());

        let mut state = SyncState {
            dataset_id: "d1".into(),
            dataset_name: "survey.csv".into(),
            region: "ahilyanagar".into(),
            row_count: 10,
            synced_at: Utc::now(),
        };
        cache.set_sync_state(&state).await.unwrap();
        state.row_count = 12;
        cache.set_sync_state(&state).await.unwrap();

        let loaded = cache.sync_state().await.unwrap().unwrap();
        assert_eq!(loaded.row_count, 12);
        assert_eq!(loaded.dataset_name, "survey.csv");
    }

    #[tokio::test]
    async fn test_open_creates_file_and_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache").join("cache.db");
        {
            let cache = LocalCache::open(&path).await.unwrap();
            cache
                .put_active_bundle(&tranche_common::types::ActiveBundle::new("Paithan", 4))
                .await
                .unwrap();
            cache.pool().close().await;
        }
        assert!(path.exists());

        let reopened = LocalCache::open(&path).await.unwrap();
        let bundle = reopened.active_bundle("paithan").await.unwrap().unwrap();
        assert_eq!(bundle.bundle_number, 4);
    }

    #[tokio::test]
    async fn test_empty_counts() {
        let cache = LocalCache::in_memory().await.unwrap();
        let counts = cache.status_counts().await.unwrap();
        assert_eq!(counts, StatusCounts::default());
        assert_eq!(counts.total(), 0);
    }
}
