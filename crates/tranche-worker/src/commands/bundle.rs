//! `tranche bundle` command implementation

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use tranche_common::BUNDLE_CAPACITY;

use super::WorkerContext;
use crate::allocation;
use crate::config::Config;
use crate::error::Result;
use crate::overrides;

pub async fn request(config: Config, sub_region: String) -> Result<()> {
    let ctx = WorkerContext::open(config).await?;
    let bundle =
        allocation::request_bundle(&ctx.cache, &ctx.client, &ctx.session, &sub_region).await?;
    println!(
        "{} Bundle {} assigned for '{}'",
        "✓".green(),
        bundle.bundle_number.to_string().bold(),
        bundle.sub_region.cyan()
    );
    Ok(())
}

pub async fn list(config: Config) -> Result<()> {
    let ctx = WorkerContext::open(config).await?;
    if let Err(e) = overrides::resync(&ctx.cache, &ctx.client, &ctx.session).await {
        tracing::warn!(error = %e, "Showing local bundles only");
    }
    let bundles = ctx.cache.active_bundles().await?;
    if bundles.is_empty() {
        println!("{} No active bundles", "ℹ".cyan());
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Sub-region", "Bundle", "Processed", "Remaining"]);
    for bundle in bundles.values() {
        let unsynced = ctx.cache.count_unsynced(&bundle.sub_region).await?;
        let processed = format!("{}/{}", bundle.count, BUNDLE_CAPACITY);
        let remaining = if bundle.is_full() && unsynced > 0 {
            format!("full, {unsynced} to sync")
        } else {
            bundle.remaining().to_string()
        };
        table.add_row(vec![
            bundle.sub_region.clone(),
            bundle.bundle_number.to_string(),
            processed,
            remaining,
        ]);
    }
    println!("{table}");
    Ok(())
}
