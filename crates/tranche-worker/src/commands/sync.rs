//! `tranche sync-in` and `tranche sync-out`

use colored::Colorize;

use super::WorkerContext;
use crate::config::Config;
use crate::error::Result;
use crate::progress::create_progress_bar;
use crate::sync;

pub async fn run_in(config: Config) -> Result<()> {
    let ctx = WorkerContext::open(config).await?;
    let pb = create_progress_bar(0, "Importing records");
    let report = sync::sync_in(&ctx.cache, &ctx.client, &ctx.session, &pb).await?;

    println!(
        "{} Synced dataset '{}' ({} rows)",
        "✓".green(),
        report.dataset_name.cyan(),
        report.total_rows
    );
    println!("  {:<20} {}", "new records:", report.inserted);
    println!("  {:<20} {}", "already cached:", report.duplicates);
    if report.missing_record_id > 0 {
        println!(
            "  {:<20} {}",
            "missing record id:".yellow(),
            report.missing_record_id
        );
    }
    Ok(())
}

pub async fn run_out(config: Config) -> Result<()> {
    let ctx = WorkerContext::open(config).await?;
    let pb = create_progress_bar(0, "Syncing records");
    let report = sync::sync_out(&ctx.cache, &ctx.client, &ctx.session, &pb).await?;

    if report.total == 0 {
        println!("{} Nothing to sync", "ℹ".cyan());
    } else {
        println!(
            "{} Synced {}/{} records",
            if report.failed == 0 { "✓".green() } else { "!".yellow() },
            report.synced,
            report.total
        );
    }
    if report.skipped_missing_sub_region > 0 {
        println!(
            "  {} {} record(s) skipped: no sub-region",
            "!".yellow(),
            report.skipped_missing_sub_region
        );
    }
    if report.skipped_no_active_bundle > 0 {
        println!(
            "  {} {} record(s) skipped: no active bundle",
            "!".yellow(),
            report.skipped_no_active_bundle
        );
    }
    if report.failed > 0 {
        println!(
            "  {} {} record(s) failed; run 'tranche sync-out' again",
            "✗".red(),
            report.failed
        );
    }
    for bundle in &report.completed_bundles {
        println!(
            "  {} Bundle {} of '{}' completed",
            "✓".green(),
            bundle.bundle_number,
            bundle.sub_region
        );
    }
    Ok(())
}
