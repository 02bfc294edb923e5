//! Link and transmit loops
//!
//! Two threads drive the link:
//!
//! - the **link thread** owns all mutable link state (state machine,
//!   command store, in-flight guard, timers) and multiplexes bridge
//!   messages, send completions and deadlines over one event channel;
//! - the **transmit thread** exclusively owns the transport. It performs
//!   the actual sends so a slow or blocking socket can never stall the
//!   state machine, and reports each outcome back as an event.
//!
//! Every dispatch is tagged with the connection epoch current at dispatch
//! time. The link thread bumps the epoch on every teardown, so a
//! completion that straggles in from a dead connection cycle is discarded
//! instead of corrupting the new one.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, error, info, trace, warn};

use rotor_protocol::{BridgeMessage, Command, encode_command, probe_packet};

use crate::config::LinkConfig;
use crate::context::LinkContext;
use crate::error::TransportError;
use crate::machine::{InFlight, LinkState, ReconnectPhase, SendKind};
use crate::metrics::LinkMetrics;
use crate::status::{LinkStatus, StatusPublisher};
use crate::transport::Transport;

/// How long the link thread parks when no deadline is scheduled.
const IDLE_PARK: Duration = Duration::from_millis(100);

/// Transmit thread poll period while waiting for work.
const TX_POLL: Duration = Duration::from_millis(10);

pub(crate) enum LoopEvent {
    Bridge(BridgeMessage),
    SendComplete {
        epoch: u64,
        kind: SendKind,
        command: Option<Command>,
        result: Result<(), TransportError>,
    },
    Shutdown,
}

pub(crate) struct SendRequest {
    epoch: u64,
    kind: SendKind,
    command: Option<Command>,
    payload: Vec<u8>,
}

/// Transmit loop: perform sends, report completions, drain replies while
/// idle. The drone's replies carry no protocol meaning.
pub(crate) fn tx_loop<T: Transport>(
    mut transport: T,
    req_rx: Receiver<SendRequest>,
    event_tx: Sender<LoopEvent>,
    is_running: Arc<AtomicBool>,
) {
    debug!("Transmit thread started");
    let mut ack_buf = [0u8; 256];
    while is_running.load(Ordering::Acquire) {
        match req_rx.recv_timeout(TX_POLL) {
            Ok(req) => {
                let result = transport.send(&req.payload);
                let complete = LoopEvent::SendComplete {
                    epoch: req.epoch,
                    kind: req.kind,
                    command: req.command,
                    result,
                };
                if event_tx.send(complete).is_err() {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => loop {
                match transport.poll_ack(&mut ack_buf) {
                    Ok(Some(len)) => trace!(len, "Drained inbound datagram"),
                    Ok(None) => break,
                    Err(e) => {
                        trace!("Receive drain error: {}", e);
                        break;
                    }
                }
            },
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    debug!("Transmit thread stopped");
}

/// The link thread's state. All of it is owned by one thread; nothing in
/// here needs a lock.
pub(crate) struct LinkDriver {
    config: LinkConfig,
    ctx: Arc<LinkContext>,
    publisher: Arc<StatusPublisher>,
    tx_req: Sender<SendRequest>,
    state: LinkState,
    /// Connection epoch; bumped on every connect attempt and teardown.
    epoch: u64,
    /// Last-write-wins command store.
    last_command: Command,
    in_flight: Option<InFlight>,
    /// Instant of the last dispatch, for the minimum inter-send gap.
    last_dispatch: Option<Instant>,
}

impl LinkDriver {
    pub(crate) fn new(
        config: LinkConfig,
        ctx: Arc<LinkContext>,
        publisher: Arc<StatusPublisher>,
        tx_req: Sender<SendRequest>,
    ) -> Self {
        Self {
            config,
            ctx,
            publisher,
            tx_req,
            state: LinkState::Disconnected,
            epoch: 0,
            last_command: Command::neutral(),
            in_flight: None,
            last_dispatch: None,
        }
    }

    pub(crate) fn run(mut self, event_rx: Receiver<LoopEvent>) {
        debug!("Link thread started");
        loop {
            let timeout = self
                .state
                .next_deadline()
                .map(|d| d.saturating_duration_since(Instant::now()))
                .unwrap_or(IDLE_PARK);
            match event_rx.recv_timeout(timeout) {
                Ok(LoopEvent::Shutdown) => break,
                Ok(LoopEvent::Bridge(msg)) => self.handle_bridge(msg),
                Ok(LoopEvent::SendComplete {
                    epoch,
                    kind,
                    command,
                    result,
                }) => self.handle_completion(epoch, kind, command, result),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            self.fire_due_timers(Instant::now());
        }
        debug!("Link thread stopped");
    }

    fn handle_bridge(&mut self, msg: BridgeMessage) {
        let now = Instant::now();
        match msg {
            BridgeMessage::Connect => self.handle_connect(now),
            BridgeMessage::Command { command, flush } => self.handle_command(now, command, flush),
            BridgeMessage::Disconnect => self.handle_disconnect(),
        }
    }

    fn handle_connect(&mut self, now: Instant) {
        if !matches!(self.state, LinkState::Disconnected) {
            debug!(state = self.state.name(), "Connect request ignored");
            return;
        }
        info!(drone = %self.config.drone_addr, "Connecting");
        // a fresh connect must start from a clean slate: an intent accepted
        // while disconnected must not spin the props the moment the probe
        // succeeds (the watchdog's reconnect keeps the live intent instead)
        self.last_command = Command::neutral();
        self.epoch += 1;
        if self.dispatch(now, SendKind::Probe, None, probe_packet().to_vec()) {
            self.state = LinkState::Connecting {
                probe_deadline: now + self.config.send_timeout,
            };
        } else {
            self.enter_disconnected(Some("Failed to dispatch connectivity probe".into()), true);
        }
    }

    /// Update the command store; a flush additionally forces an immediate
    /// transmission past both the in-flight guard and the rate limiter.
    fn handle_command(&mut self, now: Instant, command: Command, flush: bool) {
        self.last_command = command.clamped();
        if !flush {
            return;
        }
        if matches!(self.state, LinkState::Connected { .. }) {
            self.in_flight = None;
            self.dispatch_command(now);
        } else {
            debug!(state = self.state.name(), "Flush requested while not connected");
        }
    }

    fn handle_disconnect(&mut self) {
        info!("Disconnecting");
        // a stale intent must never be replayed by a later connect
        self.last_command = Command::neutral();
        self.enter_disconnected(None, true);
    }

    fn handle_completion(
        &mut self,
        epoch: u64,
        kind: SendKind,
        command: Option<Command>,
        result: Result<(), TransportError>,
    ) {
        if epoch != self.epoch {
            trace!(
                epoch,
                current = self.epoch,
                "Discarding completion from a previous connection"
            );
            LinkMetrics::incr(&self.ctx.metrics.stale_events);
            return;
        }
        self.in_flight = None;
        let now = Instant::now();
        match (self.state, kind) {
            (LinkState::Connecting { .. }, SendKind::Probe) => match result {
                Ok(()) => {
                    info!("Connected");
                    self.enter_connected(now);
                }
                Err(e) => {
                    warn!("Connection failed: {}", e);
                    self.enter_disconnected(Some(format!("Connection failed: {e}")), true);
                }
            },
            (LinkState::Reconnecting(ReconnectPhase::Probing { .. }), SendKind::Probe) => {
                match result {
                    Ok(()) => {
                        info!("Reconnected");
                        self.enter_connected(now);
                    }
                    Err(e) => {
                        warn!("Reconnect failed, giving up: {}", e);
                        self.enter_disconnected(None, false);
                    }
                }
            }
            (LinkState::Connected { .. }, SendKind::Command) => match result {
                Ok(()) => {
                    self.ctx.monitor.register_success();
                    if let Some(cmd) = command {
                        self.ctx.set_last_sent(cmd);
                    }
                    LinkMetrics::incr(&self.ctx.metrics.sends_succeeded);
                }
                Err(e) if e.is_fatal() => {
                    LinkMetrics::incr(&self.ctx.metrics.sends_failed);
                    error!("Drone unreachable, tearing the link down: {}", e);
                    self.enter_disconnected(Some(format!("Drone unreachable: {e}")), true);
                }
                Err(e) => {
                    // transient; the next tick simply tries again
                    LinkMetrics::incr(&self.ctx.metrics.sends_failed);
                    warn!("Send failed: {}", e);
                }
            },
            (state, kind) => {
                trace!(
                    state = state.name(),
                    ?kind,
                    "Completion does not match current state, ignoring"
                );
            }
        }
    }

    fn fire_due_timers(&mut self, now: Instant) {
        let mut tick_due = false;
        let mut watchdog_due = false;
        let mut probe_timeout = false;
        let mut retry_due = false;

        match &mut self.state {
            LinkState::Disconnected => {}
            LinkState::Connecting { probe_deadline } => {
                probe_timeout = now >= *probe_deadline;
            }
            LinkState::Connected {
                next_tick,
                next_watchdog,
            } => {
                if now >= *next_watchdog {
                    *next_watchdog = now + self.config.watchdog_check;
                    watchdog_due = true;
                }
                if now >= *next_tick {
                    *next_tick = now + self.config.send_interval;
                    tick_due = true;
                }
            }
            LinkState::Reconnecting(ReconnectPhase::Waiting { retry_at }) => {
                retry_due = now >= *retry_at;
            }
            LinkState::Reconnecting(ReconnectPhase::Probing { probe_deadline }) => {
                probe_timeout = now >= *probe_deadline;
            }
        }

        if watchdog_due {
            let silence = self.ctx.monitor.silence();
            if silence > self.config.watchdog_bound {
                self.trip_watchdog(now, silence);
                return;
            }
        }
        if tick_due {
            self.transmit_tick(now);
        }
        if probe_timeout {
            self.handle_probe_timeout();
        }
        if retry_due {
            self.dispatch_retry_probe(now);
        }
    }

    /// One step of the periodic command stream.
    fn transmit_tick(&mut self, now: Instant) {
        if let Some(guard) = self.in_flight {
            if now.duration_since(guard.since) > self.config.send_timeout {
                warn!(kind = ?guard.kind, "Send unresolved past timeout, clearing stuck guard");
                LinkMetrics::incr(&self.ctx.metrics.stuck_clears);
                self.in_flight = None;
            } else {
                return;
            }
        }
        if let Some(last) = self.last_dispatch {
            if now.duration_since(last) < self.config.min_send_gap {
                return;
            }
        }
        self.dispatch_command(now);
    }

    fn dispatch_command(&mut self, now: Instant) {
        let command = self.last_command;
        let payload = encode_command(&command).to_vec();
        LinkMetrics::incr(&self.ctx.metrics.sends_attempted);
        if self.dispatch(now, SendKind::Command, Some(command), payload) {
            self.last_dispatch = Some(now);
        }
    }

    fn dispatch_retry_probe(&mut self, now: Instant) {
        info!("Attempting reconnect");
        if self.dispatch(now, SendKind::Probe, None, probe_packet().to_vec()) {
            self.state = LinkState::Reconnecting(ReconnectPhase::Probing {
                probe_deadline: now + self.config.send_timeout,
            });
        } else {
            warn!("Reconnect probe could not be dispatched, giving up");
            self.enter_disconnected(None, false);
        }
    }

    /// Hand a payload to the transmit thread, tagged with the current epoch.
    fn dispatch(
        &mut self,
        now: Instant,
        kind: SendKind,
        command: Option<Command>,
        payload: Vec<u8>,
    ) -> bool {
        if kind == SendKind::Probe {
            LinkMetrics::incr(&self.ctx.metrics.probes_sent);
        }
        let req = SendRequest {
            epoch: self.epoch,
            kind,
            command,
            payload,
        };
        match self.tx_req.try_send(req) {
            Ok(()) => {
                self.in_flight = Some(InFlight { kind, since: now });
                true
            }
            Err(e) => {
                warn!(?kind, "Transmit queue rejected a dispatch: {}", e);
                false
            }
        }
    }

    fn handle_probe_timeout(&mut self) {
        match self.state {
            LinkState::Connecting { .. } => {
                warn!("Connectivity probe timed out");
                self.enter_disconnected(Some("Connectivity probe timed out".into()), true);
            }
            LinkState::Reconnecting(_) => {
                warn!("Reconnect probe timed out, giving up");
                self.enter_disconnected(None, false);
            }
            _ => {}
        }
    }

    fn trip_watchdog(&mut self, now: Instant, silence: Duration) {
        warn!(
            silence_ms = silence.as_millis() as u64,
            "Watchdog: connection lost, scheduling one reconnect attempt"
        );
        LinkMetrics::incr(&self.ctx.metrics.watchdog_trips);
        self.epoch += 1;
        self.in_flight = None;
        self.last_dispatch = None;
        self.ctx.set_connected(false);
        self.state = LinkState::Reconnecting(ReconnectPhase::Waiting {
            retry_at: now + self.config.reconnect_delay,
        });
        self.publisher.publish(LinkStatus::disconnected(Some(
            "Connection lost, attempting to reconnect".into(),
        )));
    }

    fn enter_connected(&mut self, now: Instant) {
        self.in_flight = None;
        self.last_dispatch = None;
        self.ctx.monitor.register_success();
        self.ctx.set_connected(true);
        self.state = LinkState::Connected {
            next_tick: now + self.config.send_interval,
            next_watchdog: now + self.config.watchdog_check,
        };
        self.publisher.publish(LinkStatus::connected());
    }

    /// Tear down to `Disconnected`. Bumping the epoch voids any completion
    /// still in flight from the cycle that just died.
    fn enter_disconnected(&mut self, error: Option<String>, publish: bool) {
        self.epoch += 1;
        self.in_flight = None;
        self.last_dispatch = None;
        self.state = LinkState::Disconnected;
        self.ctx.set_connected(false);
        if publish {
            self.publisher.publish(LinkStatus::disconnected(error));
        }
    }
}
