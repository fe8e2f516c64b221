//! Per-dataset and per-bundle progress

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tranche_common::BUNDLE_CAPACITY;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryQuery {
    pub region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetProgress {
    pub region: String,
    pub name: String,
    pub total_records: i64,
    pub processed_records: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleProgress {
    pub region: String,
    pub sub_region: String,
    pub bundle_number: u32,
    pub record_count: i64,
    pub is_force_completed: bool,
    pub is_complete: bool,
}

impl BundleProgress {
    /// Full bundles and force-completed bundles count as complete.
    pub fn completion(record_count: i64, is_force_completed: bool) -> bool {
        is_force_completed || record_count >= i64::from(BUNDLE_CAPACITY)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub datasets: Vec<DatasetProgress>,
    pub bundles: Vec<BundleProgress>,
    pub total_processed: i64,
    pub completed_bundles: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(sqlx::FromRow)]
struct DatasetRow {
    region: String,
    name: String,
    record_count: i64,
    processed: i64,
}

#[derive(sqlx::FromRow)]
struct BundleRow {
    region: String,
    sub_region: String,
    bundle_number: i32,
    record_count: i64,
    is_force_completed: bool,
}

#[tracing::instrument(skip(pool))]
pub async fn handle(pool: PgPool, query: SummaryQuery) -> Result<AnalyticsSummary, SummaryError> {
    let region = query.region.as_deref().map(str::trim);

    let datasets: Vec<DatasetRow> = sqlx::query_as(
        r#"
        SELECT d.region, d.name, d.record_count,
               COALESCE((
                   SELECT COUNT(*) FROM processed_records r
                   WHERE r.region = d.region AND r.source_dataset_name = d.name
               ), 0) AS processed
        FROM datasets d
        WHERE ($1::TEXT IS NULL OR d.region = $1)
        ORDER BY d.region, d.name
        "#,
    )
    .bind(region)
    .fetch_all(&pool)
    .await?;

    // Bundles with records, plus force-completed bundles that may have none.
    let bundles: Vec<BundleRow> = sqlx::query_as(
        r#"
        SELECT k.region, k.sub_region, k.bundle_number,
               COALESCE(c.record_count, 0) AS record_count,
               COALESCE(f.is_force_completed, FALSE) AS is_force_completed
        FROM (
            SELECT region, sub_region, bundle_number FROM processed_records
            UNION
            SELECT region, sub_region, bundle_number FROM bundle_flags
        ) k
        LEFT JOIN (
            SELECT region, sub_region, bundle_number, COUNT(*) AS record_count
            FROM processed_records
            GROUP BY region, sub_region, bundle_number
        ) c USING (region, sub_region, bundle_number)
        LEFT JOIN bundle_flags f USING (region, sub_region, bundle_number)
        WHERE ($1::TEXT IS NULL OR k.region = $1)
        ORDER BY k.region, k.sub_region, k.bundle_number
        "#,
    )
    .bind(region)
    .fetch_all(&pool)
    .await?;

    let bundles: Vec<BundleProgress> = bundles
        .into_iter()
        .map(|row| BundleProgress {
            is_complete: BundleProgress::completion(row.record_count, row.is_force_completed),
            region: row.region,
            sub_region: row.sub_region,
            bundle_number: row.bundle_number as u32,
            record_count: row.record_count,
            is_force_completed: row.is_force_completed,
        })
        .collect();

    let total_processed = bundles.iter().map(|b| b.record_count).sum();
    let completed_bundles = bundles.iter().filter(|b| b.is_complete).count();

    Ok(AnalyticsSummary {
        datasets: datasets
            .into_iter()
            .map(|row| DatasetProgress {
                region: row.region,
                name: row.name,
                total_records: row.record_count,
                processed_records: row.processed,
            })
            .collect(),
        bundles,
        total_processed,
        completed_bundles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_rule() {
        assert!(BundleProgress::completion(250, false));
        assert!(BundleProgress::completion(12, true));
        assert!(!BundleProgress::completion(249, false));
    }
}
