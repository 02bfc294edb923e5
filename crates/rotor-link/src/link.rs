//! Public link handle

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, bounded};
use tracing::warn;

use rotor_protocol::{BridgeMessage, Command};

use crate::config::LinkConfig;
use crate::context::LinkContext;
use crate::error::LinkError;
use crate::metrics::{LinkMetrics, MetricsSnapshot};
use crate::pipeline::{LinkDriver, LoopEvent, tx_loop};
use crate::status::{LinkStatus, StatusPublisher};
use crate::transport::{Transport, UdpTransport};

/// Event queue between API callers and the link thread.
const EVENT_QUEUE: usize = 64;

/// Dispatch queue between the link thread and the transmit thread. The
/// in-flight guard keeps it near one entry; the headroom absorbs a flush
/// racing a regular dispatch.
const SEND_QUEUE: usize = 8;

/// Handle to the drone command link.
///
/// Owns the two background threads. All methods are cheap: they either
/// post an event to the link thread or read lock-free shared state.
/// Dropping the handle shuts both threads down and joins them.
pub struct DroneLink {
    event_tx: Sender<LoopEvent>,
    ctx: Arc<LinkContext>,
    publisher: Arc<StatusPublisher>,
    is_running: Arc<AtomicBool>,
    link_thread: Option<JoinHandle<()>>,
    tx_thread: Option<JoinHandle<()>>,
}

impl DroneLink {
    /// Start the link over the given transport.
    pub fn new<T: Transport + 'static>(transport: T, config: LinkConfig) -> Self {
        let ctx = Arc::new(LinkContext::new());
        let publisher = Arc::new(StatusPublisher::new());
        let is_running = Arc::new(AtomicBool::new(true));

        let (event_tx, event_rx) = bounded(EVENT_QUEUE);
        let (req_tx, req_rx) = bounded(SEND_QUEUE);

        let tx_thread = {
            let event_tx = event_tx.clone();
            let is_running = is_running.clone();
            thread::spawn(move || tx_loop(transport, req_rx, event_tx, is_running))
        };
        let link_thread = {
            let driver = LinkDriver::new(config, ctx.clone(), publisher.clone(), req_tx);
            thread::spawn(move || driver.run(event_rx))
        };

        Self {
            event_tx,
            ctx,
            publisher,
            is_running,
            link_thread: Some(link_thread),
            tx_thread: Some(tx_thread),
        }
    }

    /// Start the link over UDP using the addresses in `config`.
    pub fn open(config: LinkConfig) -> Result<Self, LinkError> {
        let transport = UdpTransport::bind(config.local_port, config.drone_addr)?;
        Ok(Self::new(transport, config))
    }

    /// Request a connection (dispatches the connectivity probe).
    pub fn connect(&self) -> Result<(), LinkError> {
        self.post(LoopEvent::Bridge(BridgeMessage::Connect))
    }

    /// Tear the link down and reset the command store to neutral.
    pub fn disconnect(&self) -> Result<(), LinkError> {
        self.post(LoopEvent::Bridge(BridgeMessage::Disconnect))
    }

    /// Replace the stored flight intent; the stream picks it up on its
    /// next tick. Last write wins.
    pub fn send_command(&self, command: Command) -> Result<(), LinkError> {
        self.post(LoopEvent::Bridge(BridgeMessage::Command {
            command,
            flush: false,
        }))
    }

    /// Replace the stored flight intent and transmit it immediately,
    /// bypassing the rate limiter. Meant for emergency commands.
    pub fn send_command_flush(&self, command: Command) -> Result<(), LinkError> {
        self.post(LoopEvent::Bridge(BridgeMessage::Command {
            command,
            flush: true,
        }))
    }

    /// Feed a raw JSON bridge message into the link. Malformed messages
    /// are logged and dropped; they are not an error for the caller.
    pub fn handle_bridge_json(&self, text: &str) -> Result<(), LinkError> {
        match BridgeMessage::from_json(text) {
            Ok(msg) => self.post(LoopEvent::Bridge(msg)),
            Err(e) => {
                warn!("Dropping malformed bridge message: {}", e);
                LinkMetrics::incr(&self.ctx.metrics.bridge_dropped);
                Ok(())
            }
        }
    }

    /// Subscribe to connection status transitions. The current status is
    /// delivered immediately.
    pub fn subscribe(&self) -> Receiver<LinkStatus> {
        self.publisher.subscribe()
    }

    /// Latest published connection status.
    pub fn status(&self) -> LinkStatus {
        self.publisher.current()
    }

    pub fn is_connected(&self) -> bool {
        self.ctx.is_connected()
    }

    /// Last command confirmed on the wire.
    pub fn last_sent_command(&self) -> Command {
        self.ctx.last_sent_command()
    }

    /// Time since the last successful transmission.
    pub fn silence(&self) -> Duration {
        self.ctx.silence()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.ctx.metrics_snapshot()
    }

    fn post(&self, event: LoopEvent) -> Result<(), LinkError> {
        self.event_tx.send(event).map_err(|_| LinkError::NotRunning)
    }
}

impl Drop for DroneLink {
    fn drop(&mut self) {
        self.is_running.store(false, Ordering::Release);
        let _ = self.event_tx.send(LoopEvent::Shutdown);
        if let Some(handle) = self.link_thread.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.tx_thread.take() {
            let _ = handle.join();
        }
    }
}
