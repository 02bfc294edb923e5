//! Link health monitor
//!
//! Tracks the time since the last successful transmission. The watchdog
//! reads this to decide whether the drone is still reachable.
//!
//! Timestamps are monotonic micros anchored to application start, so they
//! are unaffected by system clock changes and fit in an `AtomicU64` for
//! lock-free access from both the link thread and API callers.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Global anchor for monotonic time, set once on first access.
static APP_START: OnceLock<Instant> = OnceLock::new();

fn monotonic_micros() -> u64 {
    let start = APP_START.get_or_init(Instant::now);
    start.elapsed().as_micros() as u64
}

/// Records successful sends and answers "how long has the link been silent".
pub struct LinkMonitor {
    last_success: AtomicU64,
}

impl LinkMonitor {
    pub fn new() -> Self {
        Self {
            last_success: AtomicU64::new(monotonic_micros()),
        }
    }

    /// Register a successful transmission (or a fresh connection), resetting
    /// the silence window.
    pub fn register_success(&self) {
        self.last_success.store(monotonic_micros(), Ordering::Relaxed);
    }

    /// Time since the last successful transmission.
    pub fn silence(&self) -> Duration {
        let last = self.last_success.load(Ordering::Relaxed);
        Duration::from_micros(monotonic_micros().saturating_sub(last))
    }
}

impl Default for LinkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_monotonic_time_always_increases() {
        let t1 = monotonic_micros();
        thread::sleep(Duration::from_millis(10));
        let t2 = monotonic_micros();
        assert!(t2 > t1);
    }

    #[test]
    fn test_silence_starts_near_zero() {
        let monitor = LinkMonitor::new();
        assert!(monitor.silence() < Duration::from_millis(50));
    }

    #[test]
    fn test_silence_grows_without_success() {
        let monitor = LinkMonitor::new();
        thread::sleep(Duration::from_millis(50));
        assert!(monitor.silence() >= Duration::from_millis(50));
    }

    #[test]
    fn test_success_resets_silence() {
        let monitor = LinkMonitor::new();
        thread::sleep(Duration::from_millis(50));
        monitor.register_success();
        assert!(monitor.silence() < Duration::from_millis(50));
    }
}
