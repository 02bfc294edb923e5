//! Connection state machine
//!
//! Each state variant owns the deadlines that are meaningful in it, so a
//! transition structurally discards the old state's timers. Timer leakage
//! across transitions is impossible by construction.

use std::time::Instant;

/// Which payload a dispatched send carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SendKind {
    Probe,
    Command,
}

/// Guard against overlapping transmissions. While set, the periodic tick
/// skips; it is cleared by the send's completion or force-cleared after
/// the send timeout.
#[derive(Debug, Clone, Copy)]
pub(crate) struct InFlight {
    pub kind: SendKind,
    pub since: Instant,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum ReconnectPhase {
    /// Waiting out the delay before the single retry probe.
    Waiting { retry_at: Instant },
    /// Retry probe dispatched; waiting for its completion.
    Probing { probe_deadline: Instant },
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum LinkState {
    Disconnected,
    /// Initial probe dispatched; waiting for its completion.
    Connecting { probe_deadline: Instant },
    /// Streaming commands.
    Connected {
        next_tick: Instant,
        next_watchdog: Instant,
    },
    /// Watchdog tripped; one reconnect attempt in progress.
    Reconnecting(ReconnectPhase),
}

impl LinkState {
    /// Earliest instant at which this state needs the loop to wake up.
    /// `None` means nothing is scheduled (only events can move us).
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        match self {
            LinkState::Disconnected => None,
            LinkState::Connecting { probe_deadline } => Some(*probe_deadline),
            LinkState::Connected {
                next_tick,
                next_watchdog,
            } => Some((*next_tick).min(*next_watchdog)),
            LinkState::Reconnecting(ReconnectPhase::Waiting { retry_at }) => Some(*retry_at),
            LinkState::Reconnecting(ReconnectPhase::Probing { probe_deadline }) => {
                Some(*probe_deadline)
            }
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            LinkState::Disconnected => "disconnected",
            LinkState::Connecting { .. } => "connecting",
            LinkState::Connected { .. } => "connected",
            LinkState::Reconnecting(_) => "reconnecting",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_disconnected_has_no_deadline() {
        assert!(LinkState::Disconnected.next_deadline().is_none());
    }

    #[test]
    fn test_connected_wakes_for_earliest_timer() {
        let now = Instant::now();
        let tick = now + Duration::from_millis(50);
        let watchdog = now + Duration::from_millis(1000);
        let state = LinkState::Connected {
            next_tick: tick,
            next_watchdog: watchdog,
        };
        assert_eq!(state.next_deadline(), Some(tick));

        let state = LinkState::Connected {
            next_tick: watchdog,
            next_watchdog: tick,
        };
        assert_eq!(state.next_deadline(), Some(tick));
    }

    #[test]
    fn test_reconnect_phases_expose_their_deadline() {
        let at = Instant::now() + Duration::from_millis(1000);
        assert_eq!(
            LinkState::Reconnecting(ReconnectPhase::Waiting { retry_at: at }).next_deadline(),
            Some(at)
        );
        assert_eq!(
            LinkState::Reconnecting(ReconnectPhase::Probing { probe_deadline: at }).next_deadline(),
            Some(at)
        );
    }

    #[test]
    fn test_state_names() {
        assert_eq!(LinkState::Disconnected.name(), "disconnected");
        let now = Instant::now();
        assert_eq!(
            LinkState::Connecting { probe_deadline: now }.name(),
            "connecting"
        );
        assert_eq!(
            LinkState::Reconnecting(ReconnectPhase::Waiting { retry_at: now }).name(),
            "reconnecting"
        );
    }
}
