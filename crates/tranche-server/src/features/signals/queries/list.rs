//! Pending signals of a worker

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::BTreeMap;
use tranche_common::types::{OverrideSignal, SignalKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListSignalsQuery {
    pub worker_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ListSignalsError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(sqlx::FromRow)]
struct SignalRow {
    sub_region: String,
    kind: String,
    bundle_number: Option<i32>,
    issued_at: DateTime<Utc>,
}

impl SignalRow {
    fn into_signal(self) -> Option<(String, OverrideSignal)> {
        let kind = match (self.kind.as_str(), self.bundle_number) {
            ("reset", _) => SignalKind::Reset,
            ("manual_assign", Some(n)) if n > 0 => SignalKind::ManualAssign {
                bundle_number: n as u32,
            },
            (other, bundle) => {
                tracing::warn!(kind = other, ?bundle, sub_region = %self.sub_region, "Skipping malformed signal");
                return None;
            },
        };
        Some((
            self.sub_region,
            OverrideSignal {
                kind,
                issued_at: self.issued_at,
            },
        ))
    }
}

/// Signals keyed by sub-region.
#[tracing::instrument(skip(pool, query), fields(worker = %query.worker_id))]
pub async fn handle(
    pool: PgPool,
    query: ListSignalsQuery,
) -> Result<BTreeMap<String, OverrideSignal>, ListSignalsError> {
    let rows: Vec<SignalRow> = sqlx::query_as(
        r#"
        SELECT sub_region, kind, bundle_number, issued_at
        FROM override_signals
        WHERE worker_id = $1
        ORDER BY issued_at
        "#,
    )
    .bind(query.worker_id.trim())
    .fetch_all(&pool)
    .await?;

    Ok(rows.into_iter().filter_map(SignalRow::into_signal).collect())
}
