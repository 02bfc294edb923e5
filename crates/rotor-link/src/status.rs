//! Connection status publishing
//!
//! Subscribers get the current status the moment they subscribe, then every
//! transition after that. Publishing is fire-and-forget: a full or dropped
//! subscriber never blocks the link thread or starves the others.

use std::sync::Mutex;

use arc_swap::ArcSwap;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use tracing::error;

/// Connection status as reported to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkStatus {
    pub connected: bool,
    /// Human-readable reason when a transition is caused by a failure.
    pub error: Option<String>,
}

impl LinkStatus {
    pub fn connected() -> Self {
        Self {
            connected: true,
            error: None,
        }
    }

    pub fn disconnected(error: Option<String>) -> Self {
        Self {
            connected: false,
            error,
        }
    }
}

/// Per-subscriber buffer depth. Transitions are rare; a subscriber that
/// falls this far behind starts losing intermediate updates.
const SUBSCRIBER_BUFFER: usize = 16;

pub struct StatusPublisher {
    subscribers: Mutex<Vec<Sender<LinkStatus>>>,
    current: ArcSwap<LinkStatus>,
}

impl StatusPublisher {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            current: ArcSwap::from_pointee(LinkStatus::disconnected(None)),
        }
    }

    /// Register a subscriber. The current status is replayed into the
    /// channel immediately so late subscribers never wait for the next
    /// transition to learn the state.
    pub fn subscribe(&self) -> Receiver<LinkStatus> {
        let (tx, rx) = bounded(SUBSCRIBER_BUFFER);
        let current = self.current.load_full();
        let _ = tx.try_send((*current).clone());
        match self.subscribers.lock() {
            Ok(mut subs) => subs.push(tx),
            Err(e) => error!("Status subscriber list poisoned: {}", e),
        }
        rx
    }

    /// Publish a transition to all live subscribers.
    ///
    /// Disconnected subscribers are pruned; a subscriber with a full buffer
    /// keeps its slot but misses this update.
    pub fn publish(&self, status: LinkStatus) {
        self.current.store(std::sync::Arc::new(status.clone()));
        match self.subscribers.lock() {
            Ok(mut subs) => {
                subs.retain(|tx| match tx.try_send(status.clone()) {
                    Ok(()) => true,
                    Err(TrySendError::Full(_)) => true,
                    Err(TrySendError::Disconnected(_)) => false,
                });
            }
            Err(e) => error!("Status subscriber list poisoned: {}", e),
        }
    }

    /// Latest published status.
    pub fn current(&self) -> LinkStatus {
        (**self.current.load()).clone()
    }
}

impl Default for StatusPublisher {
    fn default() -> Self {
        Self::new()
    }
}
