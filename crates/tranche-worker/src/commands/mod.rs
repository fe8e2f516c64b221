//! CLI command implementations
//!
//! Each subcommand has its own module with `run`-style functions.

pub mod admin;
pub mod bundle;
pub mod config;
pub mod local;
pub mod record;
pub mod status;
pub mod sync;
pub mod watch;

use crate::api::ApiClient;
use crate::cache::LocalCache;
use crate::config::Config;
use crate::error::Result;
use crate::session::Session;

/// Everything a worker command needs.
pub struct WorkerContext {
    pub config: Config,
    pub session: Session,
    pub cache: LocalCache,
    pub client: ApiClient,
}

impl WorkerContext {
    pub async fn open(config: Config) -> Result<Self> {
        let session = config.session()?;
        let cache = LocalCache::open(&config.cache_db_path()).await?;
        let client = ApiClient::new(&config.server_url)?;
        Ok(Self {
            config,
            session,
            cache,
            client,
        })
    }
}
