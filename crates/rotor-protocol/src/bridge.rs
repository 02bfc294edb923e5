//! UI bridge message intake
//!
//! The UI bridge talks to the link with small JSON messages carrying a
//! `type` discriminator:
//!
//! ```json
//! {"type": "connect"}
//! {"type": "command", "command": {"thrust": 50, "roll": 0, "pitch": 0, "yaw": 0}}
//! {"type": "command", "command": {...}, "queueMode": "flush"}
//! {"type": "disconnect"}
//! ```
//!
//! `queueMode: "flush"` marks an emergency command that must bypass the
//! normal rate limiter. Malformed messages parse to an error the caller
//! logs and drops; they never crash the intake.

use serde::Deserialize;

use crate::command::Command;
use crate::ProtocolError;

/// A parsed bridge message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BridgeMessage {
    /// Open the link (send the connectivity probe).
    Connect,
    /// New flight intent; `flush` requests the emergency path.
    Command { command: Command, flush: bool },
    /// Tear the link down.
    Disconnect,
}

/// Wire shape of the JSON intake, kept private so the public enum stays
/// free of serde field-name noise.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RawMessage {
    Connect,
    Command {
        command: Command,
        #[serde(rename = "queueMode")]
        queue_mode: Option<String>,
    },
    Disconnect,
}

impl BridgeMessage {
    /// Parse a JSON bridge message.
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        let raw: RawMessage = serde_json::from_str(text)?;
        Ok(match raw {
            RawMessage::Connect => BridgeMessage::Connect,
            RawMessage::Command {
                command,
                queue_mode,
            } => BridgeMessage::Command {
                command,
                flush: queue_mode.as_deref() == Some("flush"),
            },
            RawMessage::Disconnect => BridgeMessage::Disconnect,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_connect_and_disconnect() {
        assert_eq!(
            BridgeMessage::from_json(r#"{"type":"connect"}"#).unwrap(),
            BridgeMessage::Connect
        );
        assert_eq!(
            BridgeMessage::from_json(r#"{"type":"disconnect"}"#).unwrap(),
            BridgeMessage::Disconnect
        );
    }

    #[test]
    fn test_parse_regular_command() {
        let msg = BridgeMessage::from_json(
            r#"{"type":"command","command":{"thrust":50,"roll":1.5,"pitch":-2.0,"yaw":10}}"#,
        )
        .unwrap();
        match msg {
            BridgeMessage::Command { command, flush } => {
                assert!(!flush);
                assert_eq!(command.thrust, 50.0);
                assert_eq!(command.roll, 1.5);
                assert_eq!(command.pitch, -2.0);
                assert_eq!(command.yaw, 10.0);
            }
            other => panic!("expected command, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_flush_command() {
        let msg = BridgeMessage::from_json(
            r#"{"type":"command","queueMode":"flush","command":{"thrust":0,"roll":0,"pitch":0,"yaw":0}}"#,
        )
        .unwrap();
        assert!(matches!(msg, BridgeMessage::Command { flush: true, .. }));
    }

    #[test]
    fn test_unknown_queue_mode_is_not_flush() {
        let msg = BridgeMessage::from_json(
            r#"{"type":"command","queueMode":"batch","command":{"thrust":1,"roll":0,"pitch":0,"yaw":0}}"#,
        )
        .unwrap();
        assert!(matches!(msg, BridgeMessage::Command { flush: false, .. }));
    }

    #[test]
    fn test_malformed_messages_error_cleanly() {
        // unparsable JSON
        assert!(BridgeMessage::from_json("not json").is_err());
        // unknown discriminator
        assert!(BridgeMessage::from_json(r#"{"type":"launch"}"#).is_err());
        // command missing its payload
        assert!(BridgeMessage::from_json(r#"{"type":"command"}"#).is_err());
        // command payload with wrong field types
        assert!(BridgeMessage::from_json(
            r#"{"type":"command","command":{"thrust":"full","roll":0,"pitch":0,"yaw":0}}"#
        )
        .is_err());
    }
}
