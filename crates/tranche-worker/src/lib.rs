//! Tranche worker
//!
//! Offline-first client that processes records of an assigned dataset in
//! bundles of 250.
//!
//! # Overview
//!
//! - **Sync-in**: copy the assigned dataset into the local SQLite cache (`tranche sync-in`)
//! - **Bundles**: claim the next bundle number of a sub-region (`tranche bundle request`)
//! - **Processing**: stamp records with unique ids, offline (`tranche process`)
//! - **Sync-out**: push processed records to the server (`tranche sync-out`)
//! - **Overrides**: follow administrator resets and assignments (`tranche watch`)
//! - **Administration**: datasets, users, bundles and exports (`tranche admin`)

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod allocation;
pub mod api;
pub mod cache;
pub mod commands;
pub mod config;
pub mod error;
pub mod maintenance;
pub mod overrides;
pub mod processing;
pub mod progress;
pub mod remote;
pub mod session;
pub mod sync;
pub mod tabular;

pub use error::{Result, WorkerError};
pub use session::Session;

use clap::{Parser, Subcommand};

/// Tranche - bundle-based record processing
#[derive(Parser, Debug)]
#[command(name = "tranche")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Server URL (overrides the config file)
    #[arg(long, env = "TRANCHE_SERVER_URL", global = true)]
    pub server_url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import the assigned dataset into the local cache
    SyncIn,

    /// Push processed records to the server
    SyncOut,

    /// Manage active bundles
    Bundle {
        #[command(subcommand)]
        command: BundleCommand,
    },

    /// Show a pending record and the id it would get
    Lookup {
        record_id: String,
    },

    /// Process a pending record
    Process {
        record_id: String,
    },

    /// Listen for administrator overrides
    Watch {
        /// Seconds between polls (defaults to poll_interval_secs)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Show cache and bundle status
    Status,

    /// Return all processed records to pending (admin password required)
    ResetProcessed {
        #[arg(long, env = "TRANCHE_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Delete the local cache and this worker's remote state (admin password required)
    Purge {
        #[arg(long, env = "TRANCHE_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Administrative actions against the server
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum BundleCommand {
    /// Claim the next bundle of a sub-region
    Request {
        sub_region: String,
    },

    /// List active bundles
    List,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Get configuration value
    Get {
        key: String,
    },

    /// Set configuration value
    Set {
        key: String,
        value: String,
    },

    /// Show all configuration
    Show,
}

#[derive(Subcommand, Debug)]
pub enum AdminCommand {
    /// Upload a CSV dataset
    Upload {
        /// CSV file with a header row
        file: std::path::PathBuf,

        #[arg(short, long)]
        region: String,

        /// Dataset name (defaults to the file name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// List datasets of a region
    Datasets {
        #[arg(short, long)]
        region: String,
    },

    /// Delete a dataset
    DeleteDataset {
        #[arg(short, long)]
        region: String,
        id: String,
    },

    /// Export processed records of a region to CSV
    Export {
        #[arg(short, long)]
        region: String,
        output: std::path::PathBuf,
    },

    /// Delete a worker's records of its active bundle and recycle the number
    ResetProgress {
        worker_id: String,
        sub_region: String,
    },

    /// Mark a worker's active bundle complete
    ForceComplete {
        worker_id: String,
        sub_region: String,
    },

    /// Give a worker a specific bundle
    ManualAssign {
        worker_id: String,
        sub_region: String,
        bundle_number: u32,
    },

    /// Drop a worker's active bundle without touching records
    Release {
        worker_id: String,
        sub_region: String,
    },

    /// Delete every processed record
    PurgeRecords {
        #[arg(long, env = "TRANCHE_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Delete every bundle counter and active bundle
    ResetCounters {
        #[arg(long, env = "TRANCHE_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Show bundle counters
    Counters {
        #[arg(short, long)]
        region: Option<String>,
    },

    /// Manage users
    Users {
        #[command(subcommand)]
        command: UserCommand,
    },

    /// Processing progress per dataset and bundle
    Summary {
        #[arg(short, long)]
        region: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    List {
        #[arg(short, long)]
        region: Option<String>,
    },

    Get {
        id: String,
    },

    Create {
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        name: String,
        #[arg(long)]
        username: String,
        #[arg(long, default_value = "")]
        mobile: String,
        #[arg(long)]
        region: String,
        #[arg(long)]
        dataset: Option<String>,
    },

    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        mobile: Option<String>,
        #[arg(long)]
        region: Option<String>,
        #[arg(long)]
        dataset: Option<String>,
    },

    Delete {
        id: String,
    },
}
