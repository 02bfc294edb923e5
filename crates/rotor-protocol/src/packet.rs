//! Command packet and connectivity probe
//!
//! The drone accepts a fixed 16-byte datagram:
//!
//! ```text
//! offset 0      header 0x30 (protocol/port selector)
//! offset 1..5   roll  (f32, little-endian)
//! offset 5..9   pitch (f32, little-endian)
//! offset 9..13  yaw   (f32, little-endian)
//! offset 13..15 thrust scaled [0,100] -> [0,65535] (u16, little-endian)
//! offset 15     checksum: low 8 bits of the sum of bytes 0..15
//! ```
//!
//! The connectivity probe is a shorter 14-byte buffer — header, zero-filled
//! body, trailing `0x30` marker — used only to provoke a transport-level
//! send success/failure during handshake. It is not checksummed and the
//! drone never interprets it as a command.

use crate::command::Command;
use crate::ProtocolError;

/// Fixed header byte carried by every packet.
pub const PACKET_HEADER: u8 = 0x30;

/// Full command packet length in bytes.
pub const COMMAND_PACKET_LEN: usize = 16;

/// Connectivity probe length in bytes.
pub const PROBE_PACKET_LEN: usize = 14;

/// Upper bound of the thrust field on the wire.
pub const THRUST_WIRE_MAX: u16 = u16::MAX;

/// UDP port the drone listens on.
pub const DEFAULT_DRONE_PORT: u16 = 2390;

/// Local UDP port the link binds.
pub const DEFAULT_LOCAL_PORT: u16 = 2399;

/// Factory-default drone address on its own access point.
pub const DEFAULT_DRONE_IP: [u8; 4] = [192, 168, 43, 42];

/// Scale a thrust percentage onto the wire's unsigned 16-bit range.
///
/// `clamp(floor(thrust / 100 * 65535), 0, 65535)` — the clamp makes the
/// encoding total over any float input, so an out-of-range value reaching
/// this point degrades to a saturated field instead of an error.
fn scale_thrust(thrust: f32) -> u16 {
    let scaled = (f64::from(thrust) / 100.0 * f64::from(THRUST_WIRE_MAX)).floor();
    scaled.clamp(0.0, f64::from(THRUST_WIRE_MAX)) as u16
}

/// Low 8 bits of the byte sum — the trailing checksum of a command packet.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u32, |acc, &b| acc + u32::from(b)) as u8
}

/// Encode a command into the 16-byte wire packet.
///
/// Total over any input: thrust is clamped here as a last line of defense,
/// callers are still expected to clamp at intake.
pub fn encode_command(cmd: &Command) -> [u8; COMMAND_PACKET_LEN] {
    let cmd = cmd.clamped();
    let mut buf = [0u8; COMMAND_PACKET_LEN];
    buf[0] = PACKET_HEADER;
    buf[1..5].copy_from_slice(&cmd.roll.to_le_bytes());
    buf[5..9].copy_from_slice(&cmd.pitch.to_le_bytes());
    buf[9..13].copy_from_slice(&cmd.yaw.to_le_bytes());
    buf[13..15].copy_from_slice(&scale_thrust(cmd.thrust).to_le_bytes());
    buf[15] = checksum(&buf[0..15]);
    buf
}

/// Decode a 16-byte wire packet back into a command.
///
/// Used by tests and diagnostics; the link itself never decodes its own
/// traffic. Verifies the header and the trailing checksum.
pub fn decode_command(buf: &[u8]) -> Result<Command, ProtocolError> {
    if buf.len() != COMMAND_PACKET_LEN {
        return Err(ProtocolError::InvalidLength {
            expected: COMMAND_PACKET_LEN,
            actual: buf.len(),
        });
    }
    if buf[0] != PACKET_HEADER {
        return Err(ProtocolError::BadHeader {
            expected: PACKET_HEADER,
            actual: buf[0],
        });
    }
    let expected = checksum(&buf[0..15]);
    if buf[15] != expected {
        return Err(ProtocolError::BadChecksum {
            expected,
            actual: buf[15],
        });
    }

    let f32_at = |off: usize| {
        let mut b = [0u8; 4];
        b.copy_from_slice(&buf[off..off + 4]);
        f32::from_le_bytes(b)
    };
    let thrust_raw = u16::from_le_bytes([buf[13], buf[14]]);

    Ok(Command {
        thrust: (f32::from(thrust_raw) / f32::from(THRUST_WIRE_MAX)) * 100.0,
        roll: f32_at(1),
        pitch: f32_at(5),
        yaw: f32_at(9),
    })
}

/// Build the connectivity probe: header, zero body, trailing marker.
pub fn probe_packet() -> [u8; PROBE_PACKET_LEN] {
    let mut buf = [0u8; PROBE_PACKET_LEN];
    buf[0] = PACKET_HEADER;
    buf[PROBE_PACKET_LEN - 1] = PACKET_HEADER;
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_packet() {
        // {thrust:50, roll:1.5, pitch:-2.0, yaw:10} is the reference vector:
        // byte 0 = 0x30, thrust field = 32767 stored LE (0xFF, 0x7F),
        // byte 15 = sum of bytes 0..15 mod 256.
        let cmd = Command {
            thrust: 50.0,
            roll: 1.5,
            pitch: -2.0,
            yaw: 10.0,
        };
        let buf = encode_command(&cmd);
        assert_eq!(buf.len(), COMMAND_PACKET_LEN);
        assert_eq!(buf[0], 0x30);
        assert_eq!(buf[1..5], 1.5f32.to_le_bytes());
        assert_eq!(buf[5..9], (-2.0f32).to_le_bytes());
        assert_eq!(buf[9..13], 10.0f32.to_le_bytes());
        assert_eq!(buf[13], 0xFF);
        assert_eq!(buf[14], 0x7F);
        assert_eq!(buf[15], checksum(&buf[0..15]));
    }

    #[test]
    fn test_thrust_scaling_endpoints() {
        assert_eq!(scale_thrust(0.0), 0);
        assert_eq!(scale_thrust(100.0), 65535);
        assert_eq!(scale_thrust(50.0), 32767);
        // encoding clamps, never errors
        assert_eq!(scale_thrust(-10.0), 0);
        assert_eq!(scale_thrust(250.0), 65535);
    }

    #[test]
    fn test_thrust_round_trip_within_one_unit() {
        // one scaling-resolution unit in percent
        let unit = 100.0 / f32::from(THRUST_WIRE_MAX);
        for t in [0.0f32, 0.1, 1.0, 33.3, 50.0, 66.6, 99.9, 100.0] {
            let buf = encode_command(&Command {
                thrust: t,
                ..Command::neutral()
            });
            let back = decode_command(&buf).unwrap();
            assert!(
                (back.thrust - t).abs() <= unit,
                "thrust {} decoded as {} (unit {})",
                t,
                back.thrust,
                unit
            );
        }
    }

    #[test]
    fn test_attitude_fields_round_trip_exactly() {
        let cmd = Command {
            thrust: 42.0,
            roll: -13.25,
            pitch: 7.5,
            yaw: -180.0,
        };
        let back = decode_command(&encode_command(&cmd)).unwrap();
        assert_eq!(back.roll, cmd.roll);
        assert_eq!(back.pitch, cmd.pitch);
        assert_eq!(back.yaw, cmd.yaw);
    }

    #[test]
    fn test_checksum_detects_single_bit_corruption() {
        let buf = encode_command(&Command {
            thrust: 77.0,
            roll: 3.0,
            pitch: -1.0,
            yaw: 5.0,
        });
        // flipping any single bit in bytes 0..15 must change the expected
        // checksum (detectable, not correctable)
        for byte in 0..15 {
            for bit in 0..8 {
                let mut corrupted = buf;
                corrupted[byte] ^= 1 << bit;
                assert_ne!(
                    checksum(&corrupted[0..15]),
                    corrupted[15],
                    "corruption at byte {} bit {} went undetected",
                    byte,
                    bit
                );
            }
        }
    }

    #[test]
    fn test_decode_rejects_bad_header() {
        let mut buf = encode_command(&Command::neutral());
        buf[0] = 0x31;
        buf[15] = checksum(&buf[0..15]);
        assert!(matches!(
            decode_command(&buf),
            Err(ProtocolError::BadHeader { actual: 0x31, .. })
        ));
    }

    #[test]
    fn test_decode_rejects_bad_length() {
        assert!(matches!(
            decode_command(&[0u8; 8]),
            Err(ProtocolError::InvalidLength { actual: 8, .. })
        ));
    }

    #[test]
    fn test_probe_layout() {
        let probe = probe_packet();
        assert_eq!(probe.len(), PROBE_PACKET_LEN);
        assert_eq!(probe[0], PACKET_HEADER);
        assert_eq!(probe[PROBE_PACKET_LEN - 1], PACKET_HEADER);
        assert!(probe[1..PROBE_PACKET_LEN - 1].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_neutral_command_encodes_zero_fields() {
        let buf = encode_command(&Command::neutral());
        assert_eq!(buf[0], 0x30);
        assert!(buf[1..15].iter().all(|&b| b == 0));
        assert_eq!(buf[15], 0x30); // checksum of header alone
    }
}
