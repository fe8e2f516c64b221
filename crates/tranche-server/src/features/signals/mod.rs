//! Override signals
//!
//! Admin actions leave a signal per (worker, sub-region). Signals stay until
//! the worker acknowledges them, so a worker that was offline sees them on
//! its next poll.

pub mod commands;
pub mod queries;
pub mod routes;

pub use routes::signals_routes;

use tranche_common::types::SignalKind;

/// Store `kind` for `(worker_id, sub_region)`, replacing any unacknowledged signal.
pub(crate) async fn write_signal<'e, E>(
    executor: E,
    worker_id: &str,
    sub_region: &str,
    kind: SignalKind,
) -> Result<(), sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let bundle_number = match kind {
        SignalKind::ManualAssign { bundle_number } => Some(bundle_number as i32),
        SignalKind::Reset => None,
    };

    sqlx::query(
        r#"
        INSERT INTO override_signals (worker_id, sub_region, kind, bundle_number, issued_at)
        VALUES ($1, $2, $3, $4, NOW())
        ON CONFLICT (worker_id, sub_region)
        DO UPDATE SET kind = EXCLUDED.kind,
                      bundle_number = EXCLUDED.bundle_number,
                      issued_at = EXCLUDED.issued_at
        "#,
    )
    .bind(worker_id)
    .bind(sub_region)
    .bind(kind.as_str())
    .bind(bundle_number)
    .execute(executor)
    .await?;

    tracing::info!(worker = %worker_id, %sub_region, kind = kind.as_str(), "Override signal issued");
    Ok(())
}
