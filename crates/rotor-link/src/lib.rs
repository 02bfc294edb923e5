//! # Rotor Link
//!
//! Connection management for the drone command link: connect/reconnect
//! state machine, rate-governed command streaming, send watchdog and
//! status publishing.
//!
//! ## Architecture
//!
//! ```text
//!  API / UI bridge
//!        |  events
//!        v
//!  link thread (state machine, command store, timers, watchdog)
//!        |  dispatches            ^  completions
//!        v                        |
//!  transmit thread (owns the transport, performs sends)
//!        |
//!        v
//!  UDP socket -> drone
//! ```
//!
//! The link thread owns every piece of mutable link state; API calls only
//! post events or read lock-free shared state ([`context::LinkContext`]).
//! See [`link::DroneLink`] for the entry point.

pub mod config;
pub mod context;
pub mod error;
pub mod link;
pub mod metrics;
pub mod monitor;
pub mod status;
pub mod transport;

mod machine;
mod pipeline;

pub use config::LinkConfig;
pub use context::LinkContext;
pub use error::{LinkError, TransportError};
pub use link::DroneLink;
pub use metrics::MetricsSnapshot;
pub use monitor::LinkMonitor;
pub use status::{LinkStatus, StatusPublisher};
pub use transport::{Transport, UdpTransport};
