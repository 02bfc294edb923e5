//! Link configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use rotor_protocol::packet::{DEFAULT_DRONE_IP, DEFAULT_DRONE_PORT, DEFAULT_LOCAL_PORT};

/// Timing and addressing knobs for the command link.
///
/// The defaults match the drone firmware's expectations; tests shrink the
/// durations to keep wall-clock time down.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// UDP address the drone listens on.
    pub drone_addr: SocketAddr,

    /// Local UDP port to bind.
    pub local_port: u16,

    /// Period of the command stream tick.
    pub send_interval: Duration,

    /// Minimum gap between two real transmissions, enforced independently
    /// of the tick period.
    pub min_send_gap: Duration,

    /// How long a dispatched send may stay unresolved before its in-flight
    /// guard is force-cleared.
    pub send_timeout: Duration,

    /// Maximum tolerated silence (no successful send) before the watchdog
    /// declares the connection lost.
    pub watchdog_bound: Duration,

    /// How often the watchdog inspects the silence.
    pub watchdog_check: Duration,

    /// Delay before the single reconnect probe after a watchdog trip.
    pub reconnect_delay: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        let [a, b, c, d] = DEFAULT_DRONE_IP;
        Self {
            drone_addr: SocketAddr::new(
                IpAddr::V4(Ipv4Addr::new(a, b, c, d)),
                DEFAULT_DRONE_PORT,
            ),
            local_port: DEFAULT_LOCAL_PORT,
            send_interval: Duration::from_millis(50),
            min_send_gap: Duration::from_millis(25),
            send_timeout: Duration::from_millis(500),
            watchdog_bound: Duration::from_millis(2000),
            watchdog_check: Duration::from_millis(1000),
            reconnect_delay: Duration::from_millis(1000),
        }
    }
}
