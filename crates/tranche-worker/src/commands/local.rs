//! `tranche reset-processed` and `tranche purge`

use colored::Colorize;

use super::WorkerContext;
use crate::config::Config;
use crate::error::Result;
use crate::maintenance;

pub async fn reset_processed(config: Config, password: String) -> Result<()> {
    let ctx = WorkerContext::open(config).await?;
    let reset = maintenance::reset_processed(
        &ctx.cache,
        &ctx.client,
        &ctx.session,
        &password,
        ctx.config.admin_password_sha256.as_deref(),
    )
    .await?;
    println!("{} {} record(s) returned to pending", "✓".green(), reset);
    Ok(())
}

pub async fn purge(config: Config, password: String) -> Result<()> {
    let ctx = WorkerContext::open(config).await?;
    let report = maintenance::purge(
        &ctx.cache,
        &ctx.client,
        &ctx.session,
        &password,
        ctx.config.admin_password_sha256.as_deref(),
    )
    .await?;
    println!(
        "{} Removed {} cached record(s) and {} active bundle(s)",
        "✓".green(),
        report.entries,
        report.active_bundles
    );
    Ok(())
}
