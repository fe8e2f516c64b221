//! Cached dataset rows and the pending -> processed -> synced state machine

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use tranche_common::codes;
use tranche_common::types::{ActiveBundle, FieldMap, RecordStatus, SourceRow};
use tranche_common::BUNDLE_CAPACITY;

use super::{parse_status, to_u32, LocalCache};
use crate::error::{Result, WorkerError};

/// One cached row of the assigned dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntry {
    pub id: i64,
    pub dataset_id: String,
    pub record_id: String,
    pub sub_region: Option<String>,
    pub fields: FieldMap,
    pub source_dataset_name: String,
    pub status: RecordStatus,
    pub unique_id: Option<String>,
    pub bundle_number: Option<u32>,
    pub processed_by: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow)]
struct EntryRow {
    id: i64,
    dataset_id: String,
    record_id: String,
    sub_region: Option<String>,
    fields: Json<FieldMap>,
    source_dataset_name: String,
    status: String,
    unique_id: Option<String>,
    bundle_number: Option<i64>,
    processed_by: Option<String>,
    processed_at: Option<DateTime<Utc>>,
}

impl TryFrom<EntryRow> for CacheEntry {
    type Error = WorkerError;

    fn try_from(row: EntryRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            dataset_id: row.dataset_id,
            record_id: row.record_id,
            sub_region: row.sub_region,
            fields: row.fields.0,
            source_dataset_name: row.source_dataset_name,
            status: parse_status(&row.status)?,
            unique_id: row.unique_id,
            bundle_number: row
                .bundle_number
                .map(|n| to_u32(n, "bundle_number"))
                .transpose()?,
            processed_by: row.processed_by,
            processed_at: row.processed_at,
        })
    }
}

const ENTRY_COLUMNS: &str = "id, dataset_id, record_id, sub_region, fields, source_dataset_name, \
     status, unique_id, bundle_number, processed_by, processed_at";

/// Result of moving an entry from pending to processed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommittedRecord {
    pub entry: CacheEntry,
    /// The active bundle after its count was incremented.
    pub bundle: ActiveBundle,
}

impl LocalCache {
    /// Insert rows not yet cached for `dataset_id`. Rows whose
    /// `(dataset_id, record_id)` already exists are left untouched. Returns
    /// the number of rows inserted.
    pub async fn insert_rows(
        &self,
        dataset_id: &str,
        dataset_name: &str,
        rows: &[SourceRow],
    ) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for row in rows {
            inserted += sqlx::query(
                r#"
                INSERT OR IGNORE INTO cache_entries
                    (dataset_id, record_id, sub_region, fields, source_dataset_name, status)
                VALUES (?1, ?2, ?3, ?4, ?5, 'pending')
                "#,
            )
            .bind(dataset_id)
            .bind(&row.record_id)
            .bind(row.sub_region.as_deref())
            .bind(Json(&row.fields))
            .bind(dataset_name)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }

    pub async fn find_entry(&self, dataset_id: &str, record_id: &str) -> Result<Option<CacheEntry>> {
        let row = sqlx::query_as::<_, EntryRow>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM cache_entries WHERE dataset_id = ?1 AND record_id = ?2"
        ))
        .bind(dataset_id)
        .bind(record_id.trim())
        .fetch_optional(&self.pool)
        .await?;
        row.map(CacheEntry::try_from).transpose()
    }

    pub async fn entry_by_id(&self, id: i64) -> Result<Option<CacheEntry>> {
        let row = sqlx::query_as::<_, EntryRow>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM cache_entries WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(CacheEntry::try_from).transpose()
    }

    pub async fn entries_with_status(&self, status: RecordStatus) -> Result<Vec<CacheEntry>> {
        let rows = sqlx::query_as::<_, EntryRow>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM cache_entries WHERE status = ?1 ORDER BY id"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(CacheEntry::try_from).collect()
    }

    /// Processed entries of a sub-region that have not reached the remote
    /// store yet.
    pub async fn count_unsynced(&self, sub_region: &str) -> Result<i64> {
        let (n,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM cache_entries
            WHERE status = 'processed' AND sub_region = ?1 COLLATE NOCASE
            "#,
        )
        .bind(sub_region.trim())
        .fetch_one(&self.pool)
        .await?;
        Ok(n)
    }

    /// Move a pending entry to processed and consume one slot of its
    /// sub-region's active bundle, in a single transaction.
    ///
    /// The unique id is derived from the bundle count before the increment,
    /// so the entry update and the count increment either both happen or
    /// neither does.
    pub async fn commit_processed(
        &self,
        entry_id: i64,
        worker_id: &str,
        region: &str,
    ) -> Result<CommittedRecord> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, EntryRow>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM cache_entries WHERE id = ?1"
        ))
        .bind(entry_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| WorkerError::RecordNotFound(entry_id.to_string()))?;
        let entry = CacheEntry::try_from(row)?;

        if entry.status != RecordStatus::Pending {
            return Err(WorkerError::AlreadyProcessed {
                record_id: entry.record_id,
                unique_id: entry.unique_id.unwrap_or_default(),
            });
        }
        let sub_region = entry
            .sub_region
            .clone()
            .ok_or_else(|| WorkerError::MissingSubRegion(entry.record_id.clone()))?;

        let bundle = super::bundles::fetch_active_bundle(&mut *tx, &sub_region)
            .await?
            .ok_or_else(|| WorkerError::NoActiveBundle(sub_region.clone()))?;
        if bundle.is_full() {
            return Err(WorkerError::BundleFull {
                sub_region: bundle.sub_region,
                bundle_number: bundle.bundle_number,
            });
        }

        let unique_id = codes::unique_id(region, &bundle);
        let processed_at = Utc::now();

        let updated = sqlx::query(
            r#"
            UPDATE cache_entries
            SET status = 'processed', unique_id = ?1, bundle_number = ?2,
                processed_by = ?3, processed_at = ?4
            WHERE id = ?5 AND status = 'pending'
            "#,
        )
        .bind(&unique_id)
        .bind(i64::from(bundle.bundle_number))
        .bind(worker_id)
        .bind(processed_at)
        .bind(entry_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let incremented = sqlx::query(
            r#"
            UPDATE active_bundles SET count = count + 1
            WHERE sub_region = ?1 AND bundle_number = ?2 AND count = ?3 AND count < ?4
            "#,
        )
        .bind(&bundle.sub_region)
        .bind(i64::from(bundle.bundle_number))
        .bind(i64::from(bundle.count))
        .bind(i64::from(BUNDLE_CAPACITY))
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated != 1 || incremented != 1 {
            return Err(WorkerError::cache(
                "record or bundle changed during commit; nothing was saved",
            ));
        }
        tx.commit().await?;

        tracing::debug!(
            record_id = %entry.record_id,
            unique_id = %unique_id,
            bundle = bundle.bundle_number,
            count = bundle.count + 1,
            "Record processed"
        );

        let bundle = ActiveBundle {
            count: bundle.count + 1,
            ..bundle
        };
        let entry = CacheEntry {
            status: RecordStatus::Processed,
            unique_id: Some(unique_id),
            bundle_number: Some(bundle.bundle_number),
            processed_by: Some(worker_id.to_string()),
            processed_at: Some(processed_at),
            ..entry
        };
        Ok(CommittedRecord { entry, bundle })
    }

    /// processed -> synced. Returns false if the entry was not processed.
    pub async fn mark_synced(&self, entry_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE cache_entries SET status = 'synced' WHERE id = ?1 AND status = 'processed'",
        )
        .bind(entry_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Return every processed or synced entry to pending and zero the local
    /// bundle counts. Only reachable behind the admin password.
    pub async fn reset_processed(&self) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let reset = sqlx::query(
            r#"
            UPDATE cache_entries
            SET status = 'pending', unique_id = NULL, bundle_number = NULL,
                processed_by = NULL, processed_at = NULL
            WHERE status != 'pending'
            "#,
        )
        .execute(&mut *tx)
        .await?
        .rows_affected();
        sqlx::query("UPDATE active_bundles SET count = 0")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(reset, "Returned processed entries to pending");
        Ok(reset)
    }

    /// Return the entries stamped with one bundle to pending, after an
    /// administrator reset that bundle.
    pub async fn reset_bundle_entries(&self, sub_region: &str, bundle_number: u32) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE cache_entries
            SET status = 'pending', unique_id = NULL, bundle_number = NULL,
                processed_by = NULL, processed_at = NULL
            WHERE sub_region = ?1 COLLATE NOCASE AND bundle_number = ?2 AND status != 'pending'
            "#,
        )
        .bind(sub_region.trim())
        .bind(i64::from(bundle_number))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source_row(record_id: &str, taluka: Option<&str>) -> SourceRow {
        let mut fields = FieldMap::new();
        fields.insert("Search from".into(), json!(record_id));
        if let Some(t) = taluka {
            fields.insert("Taluka".into(), json!(t));
        }
        SourceRow::from_fields(fields, "Search from").unwrap()
    }

    async fn cache_with(rows: &[SourceRow]) -> LocalCache {
        let cache = LocalCache::in_memory().await.unwrap();
        cache.insert_rows("d1", "survey.csv", rows).await.unwrap();
        cache
    }

    #[tokio::test]
    async fn test_insert_ignores_existing_rows() {
        let rows = vec![source_row("R1", Some("Paithan")), source_row("R2", None)];
        let cache = cache_with(&rows).await;
        assert_eq!(cache.insert_rows("d1", "survey.csv", &rows).await.unwrap(), 0);
        assert_eq!(cache.insert_rows("d2", "other.csv", &rows).await.unwrap(), 2);
        assert_eq!(cache.status_counts().await.unwrap().pending, 4);
    }

    #[tokio::test]
    async fn test_commit_derives_id_from_count_before_increment() {
        let cache = cache_with(&[source_row("R1", Some("Paithan"))]).await;
        let mut bundle = ActiveBundle::new("Paithan", 3);
        bundle.count = 7;
        cache.put_active_bundle(&bundle).await.unwrap();

        let entry = cache.find_entry("d1", "R1").await.unwrap().unwrap();
        let committed = cache
            .commit_processed(entry.id, "w1", "chhatrapati-sambhajinagar")
            .await
            .unwrap();

        assert_eq!(committed.entry.unique_id.as_deref(), Some("CSPA507"));
        assert_eq!(committed.bundle.count, 8);
        assert_eq!(cache.active_bundle("Paithan").await.unwrap().unwrap().count, 8);
        assert_eq!(committed.entry.status, RecordStatus::Processed);
    }

    #[tokio::test]
    async fn test_second_commit_of_same_entry_is_refused() {
        let cache = cache_with(&[source_row("R1", Some("Sillod"))]).await;
        cache.put_active_bundle(&ActiveBundle::new("Sillod", 1)).await.unwrap();
        let entry = cache.find_entry("d1", "R1").await.unwrap().unwrap();

        cache.commit_processed(entry.id, "w1", "ahilyanagar").await.unwrap();
        let err = cache
            .commit_processed(entry.id, "w1", "ahilyanagar")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::AlreadyProcessed { ref unique_id, .. } if unique_id == "AHSI0"));
        assert_eq!(cache.active_bundle("Sillod").await.unwrap().unwrap().count, 1);
    }

    #[tokio::test]
    async fn test_commit_requires_room_in_bundle() {
        let cache = cache_with(&[source_row("R1", Some("Kannad")), source_row("R2", None)]).await;
        let r1 = cache.find_entry("d1", "R1").await.unwrap().unwrap();
        let r2 = cache.find_entry("d1", "R2").await.unwrap().unwrap();

        let err = cache.commit_processed(r1.id, "w1", "ahilyanagar").await.unwrap_err();
        assert!(matches!(err, WorkerError::NoActiveBundle(_)));

        let mut full = ActiveBundle::new("Kannad", 2);
        full.count = BUNDLE_CAPACITY;
        cache.put_active_bundle(&full).await.unwrap();
        let err = cache.commit_processed(r1.id, "w1", "ahilyanagar").await.unwrap_err();
        assert!(matches!(err, WorkerError::BundleFull { .. }));

        let err = cache.commit_processed(r2.id, "w1", "ahilyanagar").await.unwrap_err();
        assert!(matches!(err, WorkerError::MissingSubRegion(_)));

        let after = cache.find_entry("d1", "R1").await.unwrap().unwrap();
        assert_eq!(after.status, RecordStatus::Pending);
    }

    #[tokio::test]
    async fn test_mark_synced_only_from_processed() {
        let cache = cache_with(&[source_row("R1", Some("Soegaon"))]).await;
        cache.put_active_bundle(&ActiveBundle::new("Soegaon", 1)).await.unwrap();
        let entry = cache.find_entry("d1", "R1").await.unwrap().unwrap();

        assert!(!cache.mark_synced(entry.id).await.unwrap());
        cache.commit_processed(entry.id, "w1", "ahilyanagar").await.unwrap();
        assert!(cache.mark_synced(entry.id).await.unwrap());
        assert!(!cache.mark_synced(entry.id).await.unwrap());
        assert_eq!(cache.count_unsynced("soegaon").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reset_bundle_entries_only_touches_that_bundle() {
        let cache = cache_with(&[
            source_row("R1", Some("Paithan")),
            source_row("R2", Some("Paithan")),
        ])
        .await;
        cache.put_active_bundle(&ActiveBundle::new("Paithan", 5)).await.unwrap();
        let r1 = cache.find_entry("d1", "R1").await.unwrap().unwrap();
        cache.commit_processed(r1.id, "w1", "ahilyanagar").await.unwrap();

        assert_eq!(cache.reset_bundle_entries("PAITHAN", 4).await.unwrap(), 0);
        assert_eq!(cache.reset_bundle_entries("PAITHAN", 5).await.unwrap(), 1);
        let r1 = cache.entry_by_id(r1.id).await.unwrap().unwrap();
        assert_eq!(r1.status, RecordStatus::Pending);
        assert!(r1.unique_id.is_none());
    }
}
