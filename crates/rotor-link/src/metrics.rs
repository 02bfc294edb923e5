//! Link counters
//!
//! Plain relaxed atomics bumped from the link and transmit threads; a
//! `snapshot` gives API callers a consistent-enough view for diagnostics.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct LinkMetrics {
    /// Command dispatches handed to the transmit thread.
    pub sends_attempted: AtomicU64,
    /// Command sends the transport confirmed.
    pub sends_succeeded: AtomicU64,
    /// Command sends the transport rejected (transient or fatal).
    pub sends_failed: AtomicU64,
    /// Connectivity probes dispatched (connect and reconnect).
    pub probes_sent: AtomicU64,
    /// In-flight guards force-cleared after the send timeout.
    pub stuck_clears: AtomicU64,
    /// Watchdog trips (silence exceeded the bound).
    pub watchdog_trips: AtomicU64,
    /// Completions discarded because their connection epoch had passed.
    pub stale_events: AtomicU64,
    /// Malformed bridge messages dropped at intake.
    pub bridge_dropped: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub sends_attempted: u64,
    pub sends_succeeded: u64,
    pub sends_failed: u64,
    pub probes_sent: u64,
    pub stuck_clears: u64,
    pub watchdog_trips: u64,
    pub stale_events: u64,
    pub bridge_dropped: u64,
}

impl LinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sends_attempted: self.sends_attempted.load(Ordering::Relaxed),
            sends_succeeded: self.sends_succeeded.load(Ordering::Relaxed),
            sends_failed: self.sends_failed.load(Ordering::Relaxed),
            probes_sent: self.probes_sent.load(Ordering::Relaxed),
            stuck_clears: self.stuck_clears.load(Ordering::Relaxed),
            watchdog_trips: self.watchdog_trips.load(Ordering::Relaxed),
            stale_events: self.stale_events.load(Ordering::Relaxed),
            bridge_dropped: self.bridge_dropped.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = LinkMetrics::new();
        LinkMetrics::incr(&metrics.sends_attempted);
        LinkMetrics::incr(&metrics.sends_attempted);
        LinkMetrics::incr(&metrics.sends_succeeded);
        LinkMetrics::incr(&metrics.watchdog_trips);

        let snap = metrics.snapshot();
        assert_eq!(snap.sends_attempted, 2);
        assert_eq!(snap.sends_succeeded, 1);
        assert_eq!(snap.watchdog_trips, 1);
        assert_eq!(snap.sends_failed, 0);
    }
}
