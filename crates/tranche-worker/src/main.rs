//! Tranche worker CLI - main entry point

use clap::Parser;
use std::process;
use tracing::error;
use tranche_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use tranche_worker::commands::{self, admin, bundle, local, record, status, sync, watch};
use tranche_worker::config::Config;
use tranche_worker::{BundleCommand, Cli, Commands, ConfigCommand};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Warn
    };
    let log_config = LogConfig::builder()
        .level(level)
        .output(LogOutput::Console)
        .log_file_prefix("tranche-worker")
        .build();

    // Environment variables take precedence; the CLI works without logging
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);
    let _guard = init_logging(&log_config).ok();

    if let Err(e) = execute_command(cli).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn execute_command(cli: Cli) -> tranche_worker::Result<()> {
    let config_path = Config::default_path()?;
    let mut config = Config::load()?;
    if let Some(url) = &cli.server_url {
        config.set("server_url", url)?;
    }

    match cli.command {
        Commands::SyncIn => sync::run_in(config).await,
        Commands::SyncOut => sync::run_out(config).await,
        Commands::Bundle { command } => match command {
            BundleCommand::Request { sub_region } => bundle::request(config, sub_region).await,
            BundleCommand::List => bundle::list(config).await,
        },
        Commands::Lookup { record_id } => record::lookup(config, record_id).await,
        Commands::Process { record_id } => record::process(config, record_id).await,
        Commands::Watch { interval } => watch::run(config, interval).await,
        Commands::Status => status::run(config).await,
        Commands::ResetProcessed { password } => local::reset_processed(config, password).await,
        Commands::Purge { password } => local::purge(config, password).await,
        Commands::Config { command } => match command {
            ConfigCommand::Get { key } => commands::config::get(&config, &key),
            ConfigCommand::Set { key, value } => commands::config::set(&config_path, &key, &value),
            ConfigCommand::Show => commands::config::show(&config, &config_path),
        },
        Commands::Admin { command } => admin::run(&config, command).await,
    }
}
