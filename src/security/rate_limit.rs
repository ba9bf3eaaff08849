//! Per-client admission control with a fixed-window counter.
//!
//! A window is reset (count = 1) once more than `window` has elapsed since
//! it started; otherwise every request increments it. Requests past the
//! ceiling are rejected and still counted. Bursts straddling a window
//! boundary may see up to twice the nominal rate.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::observability::metrics;

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Rejected,
}

/// Counter state for a single client.
#[derive(Debug, Clone, Copy)]
pub struct ClientWindow {
    pub count: u64,
    pub window_start: Instant,
    last_seen: Instant,
}

impl ClientWindow {
    fn new(now: Instant) -> Self {
        Self {
            count: 1,
            window_start: now,
            last_seen: now,
        }
    }

    fn is_expired(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.window_start) > window
    }
}

/// Tracks one fixed window per client identifier.
#[derive(Debug)]
pub struct ClientWindowTracker {
    max_requests: u64,
    window: Duration,
    max_clients: usize,
    windows: DashMap<String, ClientWindow>,
}

impl ClientWindowTracker {
    pub fn new(max_requests: u64, window: Duration, max_clients: usize) -> Self {
        Self {
            max_requests,
            window,
            max_clients: max_clients.max(1),
            windows: DashMap::new(),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            config.max_requests,
            Duration::from_secs(config.window_secs),
            config.max_tracked_clients,
        )
    }

    pub fn max_requests(&self) -> u64 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Admit or reject a request from `client_id`.
    pub fn admit(&self, client_id: &str) -> Admission {
        self.admit_at(client_id, Instant::now())
    }

    /// Admission check against an explicit clock reading.
    pub fn admit_at(&self, client_id: &str, now: Instant) -> Admission {
        if !self.windows.contains_key(client_id) && self.windows.len() >= self.max_clients {
            self.evict(now);
        }

        let mut entry = self
            .windows
            .entry(client_id.to_string())
            .or_insert_with(|| ClientWindow {
                count: 0,
                window_start: now,
                last_seen: now,
            });
        let window = entry.value_mut();

        if window.count == 0 || window.is_expired(now, self.window) {
            *window = ClientWindow::new(now);
            return Admission::Allowed;
        }

        window.count += 1;
        window.last_seen = now;

        if window.count > self.max_requests {
            tracing::debug!(client = %client_id, count = window.count, "rate limit exceeded");
            Admission::Rejected
        } else {
            Admission::Allowed
        }
    }

    /// Current window for a client, if tracked.
    pub fn window_for(&self, client_id: &str) -> Option<ClientWindow> {
        self.windows.get(client_id).map(|w| *w.value())
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    /// Drop windows that have expired. Returns the number removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.windows.len();
        let window = self.window;
        self.windows.retain(|_, w| !w.is_expired(now, window));
        let removed = before.saturating_sub(self.windows.len());
        metrics::record_tracked_entries("rate_limit", self.windows.len());
        removed
    }

    /// Make room for one more client: expired windows first, then the
    /// least recently seen one.
    fn evict(&self, now: Instant) {
        if self.sweep(now) > 0 && self.windows.len() < self.max_clients {
            return;
        }

        let oldest = self
            .windows
            .iter()
            .min_by_key(|w| w.value().last_seen)
            .map(|w| w.key().clone());

        if let Some(key) = oldest {
            self.windows.remove(&key);
            tracing::trace!(client = %key, "evicted least recently seen client window");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    #[test]
    fn rejects_request_past_ceiling() {
        let tracker = ClientWindowTracker::new(3, WINDOW, 100);
        let t0 = Instant::now();

        for _ in 0..3 {
            assert_eq!(tracker.admit_at("10.0.0.1", t0), Admission::Allowed);
        }
        assert_eq!(tracker.admit_at("10.0.0.1", t0), Admission::Rejected);
        // Rejections keep counting.
        assert_eq!(tracker.window_for("10.0.0.1").unwrap().count, 4);
    }

    #[test]
    fn clients_are_independent() {
        let tracker = ClientWindowTracker::new(1, WINDOW, 100);
        let t0 = Instant::now();

        assert_eq!(tracker.admit_at("a", t0), Admission::Allowed);
        assert_eq!(tracker.admit_at("a", t0), Admission::Rejected);
        assert_eq!(tracker.admit_at("b", t0), Admission::Allowed);
    }

    #[test]
    fn window_resets_after_expiry() {
        let tracker = ClientWindowTracker::new(2, WINDOW, 100);
        let t0 = Instant::now();

        tracker.admit_at("a", t0);
        tracker.admit_at("a", t0);
        assert_eq!(tracker.admit_at("a", t0 + WINDOW), Admission::Rejected);

        let later = t0 + WINDOW + Duration::from_millis(1);
        assert_eq!(tracker.admit_at("a", later), Admission::Allowed);
        let window = tracker.window_for("a").unwrap();
        assert_eq!(window.count, 1);
        assert_eq!(window.window_start, later);
    }

    #[test]
    fn boundary_burst_allows_double_rate() {
        let tracker = ClientWindowTracker::new(2, WINDOW, 100);
        let t0 = Instant::now();
        let end_of_window = t0 + WINDOW;
        let next_window = end_of_window + Duration::from_millis(1);

        tracker.admit_at("a", t0);
        assert_eq!(tracker.admit_at("a", end_of_window), Admission::Allowed);
        assert_eq!(tracker.admit_at("a", next_window), Admission::Allowed);
        assert_eq!(tracker.admit_at("a", next_window), Admission::Allowed);
        assert_eq!(tracker.admit_at("a", next_window), Admission::Rejected);
    }

    #[test]
    fn full_tracker_evicts_least_recently_seen() {
        let tracker = ClientWindowTracker::new(10, WINDOW, 2);
        let t0 = Instant::now();

        tracker.admit_at("a", t0);
        tracker.admit_at("b", t0 + Duration::from_secs(1));
        tracker.admit_at("c", t0 + Duration::from_secs(2));

        assert_eq!(tracker.tracked_clients(), 2);
        assert!(tracker.window_for("a").is_none());
        assert!(tracker.window_for("c").is_some());
    }

    #[test]
    fn sweep_drops_only_expired_windows() {
        let tracker = ClientWindowTracker::new(10, WINDOW, 100);
        let t0 = Instant::now();

        tracker.admit_at("old", t0);
        tracker.admit_at("fresh", t0 + Duration::from_secs(30));

        let removed = tracker.sweep(t0 + WINDOW + Duration::from_secs(1));
        assert_eq!(removed, 1);
        assert!(tracker.window_for("fresh").is_some());
    }
}
