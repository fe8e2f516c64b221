//! Administrative override listener
//!
//! Admins leave signals addressed to `(worker, sub_region)`. The worker polls
//! for them, reacts, and deletes each signal once handled. Signals stay on
//! the server until deleted, so anything issued while the worker was offline
//! is picked up by the next poll. Handling is idempotent: seeing the same
//! signal twice does no harm.
//!
//! Force-complete leaves no signal; it only shows in the remote active bundle
//! map. [`catch_up`] handles both before a worker acts on its local bundles.

use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tranche_common::types::{ActiveBundles, OverrideSignal, SignalKind};
use tracing::{debug, info, warn};

use crate::cache::LocalCache;
use crate::error::Result;
use crate::remote::RemoteStore;
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandledSignal {
    pub sub_region: String,
    pub kind: SignalKind,
    /// Local entries returned to pending by a reset.
    pub reverted_entries: u64,
    pub acknowledged: bool,
}

/// Reload the local active bundles from the remote map.
pub async fn resync<R>(cache: &LocalCache, remote: &R, session: &Session) -> Result<ActiveBundles>
where
    R: RemoteStore + ?Sized,
{
    let remote_bundles = remote.active_bundles(&session.worker_id).await?;
    let merged = cache.refresh_active_bundles(&remote_bundles).await?;
    debug!(bundles = merged.len(), "Active bundles refreshed from remote");
    Ok(merged)
}

/// React to one signal. Returns the number of local entries reverted.
pub async fn apply_signal<R>(
    cache: &LocalCache,
    remote: &R,
    session: &Session,
    sub_region: &str,
    signal: &OverrideSignal,
) -> Result<u64>
where
    R: RemoteStore + ?Sized,
{
    match signal.kind {
        SignalKind::Reset => {
            let mut reverted = 0;
            if let Some(bundle) = cache.active_bundle(sub_region).await? {
                cache.remove_active_bundle(sub_region).await?;
                reverted = cache
                    .reset_bundle_entries(sub_region, bundle.bundle_number)
                    .await?;
                info!(sub_region, bundle = bundle.bundle_number, reverted, "Bundle reset by administrator");
            }
            remote
                .remove_active_bundle(&session.worker_id, sub_region)
                .await?;
            Ok(reverted)
        },
        SignalKind::ManualAssign { bundle_number } => {
            resync(cache, remote, session).await?;
            info!(sub_region, bundle_number, "Bundle assigned by administrator");
            Ok(0)
        },
    }
}

/// Fetch, handle and acknowledge every pending signal once.
///
/// A signal whose handling fails is left on the server for the next poll.
pub async fn poll_once<R>(cache: &LocalCache, remote: &R, session: &Session) -> Result<Vec<HandledSignal>>
where
    R: RemoteStore + ?Sized,
{
    let signals = remote.signals(&session.worker_id).await?;
    let mut handled = Vec::with_capacity(signals.len());

    for (sub_region, signal) in &signals {
        let reverted_entries = match apply_signal(cache, remote, session, sub_region, signal).await {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, %sub_region, kind = signal.kind.as_str(), "Signal not handled");
                continue;
            },
        };
        let acknowledged = match remote.acknowledge_signal(&session.worker_id, sub_region).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, %sub_region, "Signal handled but not acknowledged");
                false
            },
        };
        handled.push(HandledSignal {
            sub_region: sub_region.clone(),
            kind: signal.kind,
            reverted_entries,
            acknowledged,
        });
    }
    Ok(handled)
}

/// Handle pending signals, then reload the active bundles from the remote.
pub async fn reconcile<R>(cache: &LocalCache, remote: &R, session: &Session) -> Result<Vec<HandledSignal>>
where
    R: RemoteStore + ?Sized,
{
    let handled = poll_once(cache, remote, session).await?;
    resync(cache, remote, session).await?;
    Ok(handled)
}

/// [`reconcile`] when the remote is reachable. Returns whether it was;
/// otherwise the caller carries on with its local copy.
pub async fn catch_up<R>(cache: &LocalCache, remote: &R, session: &Session) -> bool
where
    R: RemoteStore + ?Sized,
{
    match reconcile(cache, remote, session).await {
        Ok(handled) => {
            for signal in &handled {
                info!(sub_region = %signal.sub_region, kind = signal.kind.as_str(), "Override applied");
            }
            true
        },
        Err(e) => {
            debug!(error = %e, "Remote not reachable, using local bundles");
            false
        },
    }
}

/// Reconcile every `period` until `shutdown` resolves. Poll failures are logged
/// and retried on the next tick.
pub async fn watch<R, F, C>(
    cache: &LocalCache,
    remote: &R,
    session: &Session,
    period: Duration,
    shutdown: F,
    mut on_handled: C,
) -> Result<()>
where
    R: RemoteStore + ?Sized,
    F: Future<Output = ()>,
    C: FnMut(&HandledSignal),
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Override listener stopped");
                return Ok(());
            }
            _ = ticker.tick() => {
                match reconcile(cache, remote, session).await {
                    Ok(handled) => handled.iter().for_each(&mut on_handled),
                    Err(e) => warn!(error = %e, "Polling for overrides failed"),
                }
            }
        }
    }
}
