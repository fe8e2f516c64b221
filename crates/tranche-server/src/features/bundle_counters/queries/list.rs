//! List bundle counters query

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tranche_common::types::BundleCounter;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListCountersQuery {
    pub region: Option<String>,
}

/// A counter as shown to admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterView {
    pub region: String,
    pub sub_region: String,
    pub next_bundle_number: u32,
    pub gaps: Vec<u32>,
    /// Number the next allocation will return.
    pub next_to_assign: u32,
}

impl CounterView {
    fn new(region: String, sub_region: String, counter: BundleCounter) -> Self {
        let next_to_assign = counter.next_to_assign();
        let mut gaps = counter.gaps;
        gaps.sort_unstable();
        Self {
            region,
            sub_region,
            next_bundle_number: counter.next_bundle_number,
            gaps,
            next_to_assign,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ListCountersError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: PgPool,
    query: ListCountersQuery,
) -> Result<Vec<CounterView>, ListCountersError> {
    let rows: Vec<(String, String, i32, Vec<i32>)> = sqlx::query_as(
        r#"
        SELECT region, sub_region, next_bundle_number, gaps
        FROM bundle_counters
        WHERE ($1::TEXT IS NULL OR region = $1)
        ORDER BY region, sub_region
        "#,
    )
    .bind(query.region.as_deref().map(str::trim))
    .fetch_all(&pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(region, sub_region, next, gaps)| {
            CounterView::new(
                region,
                sub_region,
                BundleCounter {
                    next_bundle_number: next as u32,
                    gaps: gaps.into_iter().map(|g| g as u32).collect(),
                },
            )
        })
        .collect())
}
