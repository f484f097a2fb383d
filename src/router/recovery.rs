//! Blocked-key recovery
//!
//! Optional periodic `reset_all()` over a set of pools. The invoker never
//! unblocks keys on its own; this task is the external scheduler for
//! deployments whose provider quotas refill on a known window.

use crate::router::KeyPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Unblock every key in every pool, returning the number unblocked
pub fn recover(pools: &[Arc<KeyPool>]) -> usize {
    pools
        .iter()
        .map(|pool| {
            let unblocked = pool.reset_all();
            if unblocked > 0 {
                tracing::info!(provider = %pool.provider(), unblocked, "Unblocked keys");
            }
            unblocked
        })
        .sum()
}

/// Spawn a task resetting the pools every `interval`
///
/// The first reset happens one full interval after spawning.
pub fn spawn_recovery(pools: Vec<Arc<KeyPool>>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            recover(&pools);
        }
    })
}
