//! PostgreSQL-backed [`CounterStore`]

use async_trait::async_trait;
use sqlx::PgPool;
use tranche_common::counter::{CounterKey, CounterStore, Versioned};
use tranche_common::types::BundleCounter;
use tranche_common::Result;

use crate::features::shared::db_errors::to_storage_error;

/// Counters live in `bundle_counters`; `version` guards every write.
#[derive(Clone)]
pub struct PgCounterStore {
    pool: PgPool,
}

impl PgCounterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn to_numbers(gaps: &[u32]) -> Vec<i32> {
    gaps.iter().map(|g| *g as i32).collect()
}

#[async_trait]
impl CounterStore for PgCounterStore {
    async fn load(&self, key: &CounterKey) -> Result<Option<Versioned<BundleCounter>>> {
        let row: Option<(i32, Vec<i32>, i64)> = sqlx::query_as(
            r#"
            SELECT next_bundle_number, gaps, version
            FROM bundle_counters
            WHERE region = $1 AND sub_region = $2
            "#,
        )
        .bind(&key.region)
        .bind(&key.sub_region)
        .fetch_optional(&self.pool)
        .await
        .map_err(to_storage_error)?;

        Ok(row.map(|(next, gaps, version)| Versioned {
            value: BundleCounter {
                next_bundle_number: next as u32,
                gaps: gaps.into_iter().map(|g| g as u32).collect(),
            },
            version,
        }))
    }

    async fn compare_and_swap(
        &self,
        key: &CounterKey,
        expected_version: Option<i64>,
        next: &BundleCounter,
    ) -> Result<bool> {
        let result = match expected_version {
            None => sqlx::query(
                r#"
                INSERT INTO bundle_counters (region, sub_region, next_bundle_number, gaps, version)
                VALUES ($1, $2, $3, $4, 1)
                ON CONFLICT (region, sub_region) DO NOTHING
                "#,
            )
            .bind(&key.region)
            .bind(&key.sub_region)
            .bind(next.next_bundle_number as i32)
            .bind(to_numbers(&next.gaps))
            .execute(&self.pool)
            .await,
            Some(version) => sqlx::query(
                r#"
                UPDATE bundle_counters
                SET next_bundle_number = $3, gaps = $4, version = version + 1, updated_at = NOW()
                WHERE region = $1 AND sub_region = $2 AND version = $5
                "#,
            )
            .bind(&key.region)
            .bind(&key.sub_region)
            .bind(next.next_bundle_number as i32)
            .bind(to_numbers(&next.gaps))
            .bind(version)
            .execute(&self.pool)
            .await,
        }
        .map_err(to_storage_error)?;

        Ok(result.rows_affected() == 1)
    }
}
