//! TTL Sweep Task
//!
//! Background task that periodically removes expired entries from the
//! recency tail of the cache.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheStore;

// == Cleaner ==
/// Handle to the background sweep task.
///
/// The task stops on an explicit shutdown signal; [`Cleaner::stop`] sends
/// it and waits for the task to finish before returning.
#[derive(Debug)]
pub(crate) struct Cleaner {
    handle: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

impl Cleaner {
    /// Spawns the sweep task with the given tick period.
    pub(crate) fn spawn(store: Arc<Mutex<CacheStore>>, period: Duration) -> Self {
        let (shutdown, signal) = watch::channel(false);
        let handle = spawn_cleanup_task(store, period, signal);
        Self { handle, shutdown }
    }

    /// Signals the task to stop and joins it.
    pub(crate) async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}

/// Spawns a task that sweeps expired entries every `period`.
///
/// Each tick acquires the cache lock and removes expired entries from the
/// recency tail, stopping at the first live tail entry. The task exits on
/// the shutdown signal, or when the signal's sender is dropped.
pub(crate) fn spawn_cleanup_task(
    store: Arc<Mutex<CacheStore>>,
    period: Duration,
    mut signal: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(?period, "starting TTL sweep task");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(period) => {
                    let removed = {
                        let mut store = store.lock().await;
                        store.sweep_expired_tail()
                    };

                    if removed > 0 {
                        info!(removed, "TTL sweep removed expired entries");
                    } else {
                        debug!("TTL sweep found no expired tail entries");
                    }
                }
                _ = signal.changed() => {
                    debug!("TTL sweep task stopping");
                    break;
                }
            }
        }
    })
}
