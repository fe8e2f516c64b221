//! `tranche lookup` and `tranche process`

use colored::Colorize;

use super::WorkerContext;
use crate::config::Config;
use crate::error::Result;
use crate::processing;

pub async fn lookup(config: Config, record_id: String) -> Result<()> {
    let ctx = WorkerContext::open(config).await?;
    let found = processing::lookup(&ctx.cache, &ctx.session, &record_id).await?;
    let entry = &found.entry;

    println!("{} {}", "Record".cyan().bold(), entry.record_id.bold());
    println!(
        "  {:<14} {}",
        "sub-region:",
        entry.sub_region.as_deref().unwrap_or("-")
    );
    println!(
        "  {:<14} {}",
        "pdf required:",
        found.pdf_required.as_deref().unwrap_or("-")
    );
    match &found.next_unique_id {
        Some(id) => println!("  {:<14} {}", "next id:", id.green()),
        None => println!(
            "  {:<14} {}",
            "next id:",
            "request a bundle for this sub-region first".yellow()
        ),
    }
    for (name, value) in &entry.fields {
        let value = tranche_common::fields::value_to_string(value).unwrap_or_default();
        println!("  {:<14} {}", format!("{}:", name.trim()).dimmed(), value);
    }
    Ok(())
}

pub async fn process(config: Config, record_id: String) -> Result<()> {
    let ctx = WorkerContext::open(config).await?;
    let committed = processing::process(&ctx.cache, &ctx.client, &ctx.session, &record_id).await?;
    println!(
        "{} {} -> {} (bundle {}, {}/{})",
        "✓".green(),
        committed.entry.record_id,
        committed.entry.unique_id.as_deref().unwrap_or_default().bold(),
        committed.bundle.bundle_number,
        committed.bundle.count,
        tranche_common::BUNDLE_CAPACITY
    );
    if committed.bundle.is_full() {
        println!(
            "  {} Bundle is full. Run 'tranche sync-out' before requesting the next one.",
            "ℹ".cyan()
        );
    }
    Ok(())
}
