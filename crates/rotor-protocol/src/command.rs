//! Flight intent record
//!
//! A `Command` is the single unit of intent the UI bridge pushes into the
//! link: desired collective thrust plus attitude targets. The link keeps
//! only the most recent value (last write wins) — there is no queue.

use serde::{Deserialize, Serialize};

/// A single flight intent.
///
/// `thrust` is a percentage in `[0, 100]`; `roll`/`pitch` are attitude
/// targets in degrees; `yaw` is a rate target in degrees per second.
/// Values outside the thrust range are clamped before encoding, never
/// rejected.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Command {
    pub thrust: f32,
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

impl Command {
    /// All-zero command: no thrust, level attitude, no yaw rate.
    ///
    /// This is what the command store is reset to on disconnect, so a
    /// later reconnect never replays a stale intent.
    pub const fn neutral() -> Self {
        Command {
            thrust: 0.0,
            roll: 0.0,
            pitch: 0.0,
            yaw: 0.0,
        }
    }

    /// Copy with thrust clamped to its valid `[0, 100]` range.
    pub fn clamped(self) -> Self {
        Command {
            thrust: self.thrust.clamp(0.0, 100.0),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_is_default() {
        assert_eq!(Command::neutral(), Command::default());
    }

    #[test]
    fn test_clamped_limits_thrust_only() {
        let cmd = Command {
            thrust: 150.0,
            roll: -400.0,
            pitch: 2.0,
            yaw: -10.0,
        };
        let clamped = cmd.clamped();
        assert_eq!(clamped.thrust, 100.0);
        // attitude fields pass through untouched
        assert_eq!(clamped.roll, -400.0);
        assert_eq!(clamped.pitch, 2.0);
        assert_eq!(clamped.yaw, -10.0);

        let cmd = Command {
            thrust: -5.0,
            ..Command::neutral()
        };
        assert_eq!(cmd.clamped().thrust, 0.0);
    }

    #[test]
    fn test_json_round_trip() {
        let cmd = Command {
            thrust: 50.0,
            roll: 1.5,
            pitch: -2.0,
            yaw: 10.0,
        };
        let json = serde_json::to_string(&cmd).unwrap();
        let back: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(cmd, back);
    }
}
