//! Link-level error types

use thiserror::Error;

/// Errors surfaced by the transport layer.
///
/// The link cares about exactly one distinction: `Unreachable` is fatal
/// (the route to the drone is gone, retrying the same send cannot help),
/// everything else is transient and the periodic stream simply tries again
/// on the next tick.
#[derive(Error, Debug)]
pub enum TransportError {
    /// No route to the drone (network or host unreachable).
    #[error("Destination unreachable: {0}")]
    Unreachable(String),

    /// Any other IO failure; treated as transient.
    #[error("Transport IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Fatal errors tear the link down immediately instead of riding out
    /// the watchdog.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TransportError::Unreachable(_))
    }
}

/// Errors surfaced by the public link API.
#[derive(Error, Debug)]
pub enum LinkError {
    /// The background link thread has exited; the handle is unusable.
    #[error("Link thread is not running")]
    NotRunning,

    /// Failed to set up the transport (bind, socket options).
    #[error("Transport setup failed: {0}")]
    Transport(#[from] TransportError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_unreachable_is_fatal() {
        assert!(TransportError::Unreachable("network unreachable".into()).is_fatal());
    }

    #[test]
    fn test_io_errors_are_transient() {
        let err = TransportError::Io(io::Error::new(io::ErrorKind::WouldBlock, "busy"));
        assert!(!err.is_fatal());
    }
}
