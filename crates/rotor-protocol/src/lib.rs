//! # Rotor Protocol
//!
//! Wire protocol for the drone command link (no IO dependencies).
//!
//! ## Modules
//!
//! - `command`: the flight intent record (thrust/roll/pitch/yaw)
//! - `packet`: 16-byte command packet and 14-byte connectivity probe
//! - `bridge`: typed UI-bridge messages (JSON intake)
//!
//! ## Wire format
//!
//! All multi-byte fields are little-endian. Angles travel as IEEE-754
//! `f32`; thrust travels as a `u16` scaled from `[0, 100]` percent onto
//! the full unsigned 16-bit range.

pub mod bridge;
pub mod command;
pub mod packet;

pub use bridge::BridgeMessage;
pub use command::Command;
pub use packet::{
    checksum, decode_command, encode_command, probe_packet, COMMAND_PACKET_LEN, DEFAULT_DRONE_IP,
    DEFAULT_DRONE_PORT, DEFAULT_LOCAL_PORT, PACKET_HEADER, PROBE_PACKET_LEN, THRUST_WIRE_MAX,
};

use thiserror::Error;

/// Protocol-level error type
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Packet does not start with the `0x30` header byte
    #[error("Invalid packet header: expected 0x{expected:02X}, got 0x{actual:02X}")]
    BadHeader { expected: u8, actual: u8 },

    /// Trailing checksum byte does not match the byte sum
    #[error("Checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    BadChecksum { expected: u8, actual: u8 },

    /// Buffer is not a whole command packet
    #[error("Invalid packet length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Bridge message could not be parsed
    #[error("Malformed bridge message: {0}")]
    BadMessage(#[from] serde_json::Error),
}
