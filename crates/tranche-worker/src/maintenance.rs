//! Password-gated local maintenance
//!
//! Both actions destroy local progress, so the password is checked before
//! anything is touched.

use tranche_common::auth;
use tracing::warn;

use crate::cache::{LocalCache, PurgeReport};
use crate::error::Result;
use crate::overrides;
use crate::remote::RemoteStore;
use crate::session::Session;

/// Return every processed or synced entry to pending and zero the bundle
/// counts, locally and (best effort) remotely. Overrides are applied first so
/// only bundles the server still has are republished.
pub async fn reset_processed<R>(
    cache: &LocalCache,
    remote: &R,
    session: &Session,
    password: &str,
    expected_sha256: Option<&str>,
) -> Result<u64>
where
    R: RemoteStore + ?Sized,
{
    auth::verify_admin_password(password, expected_sha256)?;
    overrides::catch_up(cache, remote, session).await;
    let reset = cache.reset_processed().await?;

    for bundle in cache.active_bundles().await?.values() {
        if let Err(e) = remote.put_active_bundle(&session.worker_id, bundle).await {
            warn!(error = %e, sub_region = %bundle.sub_region, "Zeroed count not published");
        }
    }
    Ok(reset)
}

/// Wipe the worker's remote state, then the whole local cache.
///
/// The remote state goes first: if the server cannot be reached, nothing
/// local is deleted.
pub async fn purge<R>(
    cache: &LocalCache,
    remote: &R,
    session: &Session,
    password: &str,
    expected_sha256: Option<&str>,
) -> Result<PurgeReport>
where
    R: RemoteStore + ?Sized,
{
    auth::verify_admin_password(password, expected_sha256)?;
    remote.clear_user_state(&session.worker_id).await?;
    cache.purge().await
}
