//! Periodic sweeping of the in-memory stores.
//!
//! Expired client windows and stale cache entries are dropped on a fixed
//! interval so memory stays proportional to recent traffic.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time;

use crate::cache::ResponseCache;
use crate::lifecycle::ShutdownSignal;
use crate::security::ClientWindowTracker;

pub struct Housekeeper {
    tracker: Option<Arc<ClientWindowTracker>>,
    cache: Option<Arc<ResponseCache>>,
    interval: Duration,
}

impl Housekeeper {
    pub fn new(
        tracker: Option<Arc<ClientWindowTracker>>,
        cache: Option<Arc<ResponseCache>>,
        interval: Duration,
    ) -> Self {
        Self {
            tracker,
            cache,
            interval,
        }
    }

    /// One sweep over both stores. Returns (windows removed, entries removed).
    pub fn sweep(&self, now: Instant) -> (usize, usize) {
        let windows = self.tracker.as_ref().map(|t| t.sweep(now)).unwrap_or(0);
        let entries = self.cache.as_ref().map(|c| c.sweep(now)).unwrap_or(0);
        if windows > 0 || entries > 0 {
            tracing::debug!(windows, entries, "Swept expired state");
        }
        (windows, entries)
    }

    pub async fn run(self, mut shutdown: ShutdownSignal) {
        if self.tracker.is_none() && self.cache.is_none() {
            tracing::debug!("Nothing to sweep, housekeeper idle");
            return;
        }

        tracing::info!(interval_secs = self.interval.as_secs(), "Housekeeper starting");

        let mut ticker = time::interval(self.interval);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep(Instant::now());
                }
                _ = shutdown.recv() => {
                    tracing::info!("Housekeeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
