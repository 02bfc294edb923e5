//! Shared link context
//!
//! One `Arc<LinkContext>` is held by the public handle, the link thread
//! and the transmit thread. Everything in it is lock-free: API calls read
//! it without touching the link thread's event queue.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use arc_swap::ArcSwap;
use rotor_protocol::Command;

use crate::metrics::{LinkMetrics, MetricsSnapshot};
use crate::monitor::LinkMonitor;

pub struct LinkContext {
    connected: AtomicBool,
    /// Last command confirmed sent (wire order preserved by the single
    /// transmit thread).
    last_sent: ArcSwap<Command>,
    pub monitor: LinkMonitor,
    pub metrics: LinkMetrics,
}

impl LinkContext {
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            last_sent: ArcSwap::from_pointee(Command::neutral()),
            monitor: LinkMonitor::new(),
            metrics: LinkMetrics::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }

    pub fn last_sent_command(&self) -> Command {
        **self.last_sent.load()
    }

    pub(crate) fn set_last_sent(&self, command: Command) {
        self.last_sent.store(Arc::new(command));
    }

    /// Time since the last successful transmission.
    pub fn silence(&self) -> Duration {
        self.monitor.silence()
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl Default for LinkContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_disconnected_and_neutral() {
        let ctx = LinkContext::new();
        assert!(!ctx.is_connected());
        assert_eq!(ctx.last_sent_command(), Command::neutral());
    }

    #[test]
    fn test_last_sent_updates() {
        let ctx = LinkContext::new();
        let cmd = Command {
            thrust: 30.0,
            roll: 1.0,
            pitch: 0.0,
            yaw: -2.0,
        };
        ctx.set_last_sent(cmd);
        assert_eq!(ctx.last_sent_command(), cmd);
    }

    #[test]
    fn test_connected_flag_round_trip() {
        let ctx = LinkContext::new();
        ctx.set_connected(true);
        assert!(ctx.is_connected());
        ctx.set_connected(false);
        assert!(!ctx.is_connected());
    }
}
