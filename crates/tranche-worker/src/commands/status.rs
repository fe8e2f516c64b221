//! `tranche status` command implementation

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};

use super::WorkerContext;
use crate::config::Config;
use crate::error::Result;

pub async fn run(config: Config) -> Result<()> {
    let ctx = WorkerContext::open(config).await?;
    let online = ctx.client.health_check().await?;

    println!("{}", "Worker".cyan().bold());
    println!("  {:<12} {}", "worker:", ctx.session.worker_id);
    println!("  {:<12} {}", "region:", ctx.session.region);
    println!("  {:<12} {}", "dataset:", ctx.session.dataset_name);
    println!(
        "  {:<12} {} ({})",
        "server:",
        ctx.client.base_url(),
        if online { "online".green() } else { "offline".red() }
    );
    println!();

    match ctx.cache.sync_state().await? {
        Some(state) => println!(
            "{} '{}' synced {} ({} rows)",
            "Cache".cyan().bold(),
            state.dataset_name,
            state.synced_at.format("%Y-%m-%d %H:%M"),
            state.row_count
        ),
        None => println!(
            "{} empty, run 'tranche sync-in'",
            "Cache".cyan().bold()
        ),
    }

    let counts = ctx.cache.status_counts().await?;
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Pending", "Processed (unsynced)", "Synced", "Total"]);
    table.add_row(vec![
        counts.pending.to_string(),
        counts.processed.to_string(),
        counts.synced.to_string(),
        counts.total().to_string(),
    ]);
    println!("{table}");

    let bundles = ctx.cache.active_bundles().await?;
    if !bundles.is_empty() {
        println!("{}", "Active bundles".cyan().bold());
        for bundle in bundles.values() {
            println!(
                "  {:<28} #{:<5} {}/{}",
                bundle.sub_region,
                bundle.bundle_number,
                bundle.count,
                tranche_common::BUNDLE_CAPACITY
            );
        }
    }
    Ok(())
}
