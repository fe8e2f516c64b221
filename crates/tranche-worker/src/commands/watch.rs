//! `tranche watch` command implementation

use colored::Colorize;
use std::time::Duration;
use tranche_common::types::SignalKind;

use super::WorkerContext;
use crate::config::Config;
use crate::error::Result;
use crate::overrides::{self, HandledSignal};

fn report(handled: &HandledSignal) {
    let ack = if handled.acknowledged {
        String::new()
    } else {
        " (not acknowledged, will retry)".yellow().to_string()
    };
    match handled.kind {
        SignalKind::Reset => println!(
            "{} Bundle of '{}' was reset by an administrator; {} record(s) returned to pending{}",
            "!".yellow(),
            handled.sub_region,
            handled.reverted_entries,
            ack
        ),
        SignalKind::ManualAssign { bundle_number } => println!(
            "{} Bundle {} of '{}' was assigned by an administrator{}",
            "ℹ".cyan(),
            bundle_number,
            handled.sub_region,
            ack
        ),
    }
}

pub async fn run(config: Config, interval: Option<u64>) -> Result<()> {
    let period = Duration::from_secs(interval.unwrap_or(config.poll_interval_secs).max(1));
    let ctx = WorkerContext::open(config).await?;
    println!(
        "{} Listening for overrides every {}s (Ctrl+C to stop)",
        "ℹ".cyan(),
        period.as_secs()
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };
    overrides::watch(&ctx.cache, &ctx.client, &ctx.session, period, shutdown, report).await
}
