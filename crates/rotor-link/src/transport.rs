//! Datagram transport
//!
//! The link never touches a socket directly; it talks through the
//! [`Transport`] trait so tests can substitute a scripted fake. The real
//! implementation is a thin wrapper over a broadcast-enabled UDP socket.

use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};

use tracing::debug;

use crate::error::TransportError;

/// One-way datagram channel to the drone.
///
/// `send` must not block indefinitely; a result (ok or error) is expected
/// promptly so the in-flight guard upstream resolves. `poll_ack` drains
/// any inbound datagram without blocking — the drone's replies carry no
/// protocol meaning, they are logged and dropped.
pub trait Transport: Send {
    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError>;

    /// Non-blocking receive of one inbound datagram. `Ok(None)` means
    /// nothing is pending.
    fn poll_ack(&mut self, _buf: &mut [u8]) -> Result<Option<usize>, TransportError> {
        Ok(None)
    }
}

/// UDP transport bound to the local command port.
pub struct UdpTransport {
    socket: UdpSocket,
    drone_addr: SocketAddr,
}

impl UdpTransport {
    /// Bind the local port and aim at the drone.
    ///
    /// Broadcast is enabled because the drone's access point hands out
    /// addresses in a /24 and some firmware revisions answer probes sent
    /// to the subnet broadcast address. The socket is non-blocking so
    /// `poll_ack` can drain without stalling the transmit thread.
    pub fn bind(local_port: u16, drone_addr: SocketAddr) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, local_port))?;
        socket.set_broadcast(true)?;
        socket.set_nonblocking(true)?;
        debug!(local = %socket.local_addr()?, drone = %drone_addr, "UDP transport bound");
        Ok(Self { socket, drone_addr })
    }
}

impl Transport for UdpTransport {
    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        match self.socket.send_to(payload, self.drone_addr) {
            Ok(_) => Ok(()),
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::NetworkUnreachable | ErrorKind::HostUnreachable
                ) =>
            {
                Err(TransportError::Unreachable(e.to_string()))
            }
            Err(e) => Err(TransportError::Io(e)),
        }
    }

    fn poll_ack(&mut self, buf: &mut [u8]) -> Result<Option<usize>, TransportError> {
        match self.socket.recv_from(buf) {
            Ok((len, from)) => {
                debug!(%from, len, "inbound datagram");
                Ok(Some(len))
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(TransportError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    #[test]
    fn test_send_and_poll_over_loopback() {
        // a plain socket stands in for the drone
        let drone = UdpSocket::bind("127.0.0.1:0").unwrap();
        let drone_addr = drone.local_addr().unwrap();

        let mut transport = UdpTransport::bind(0, drone_addr).unwrap();
        transport.send(&[0x30, 0x01, 0x02]).unwrap();

        let mut buf = [0u8; 64];
        let (len, from) = drone.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..len], &[0x30, 0x01, 0x02]);

        // reply and drain it through poll_ack
        drone.send_to(b"ok", from).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        let mut ack = [0u8; 64];
        assert_eq!(transport.poll_ack(&mut ack).unwrap(), Some(2));
        assert_eq!(&ack[..2], b"ok");
    }

    #[test]
    fn test_poll_ack_empty_is_none() {
        let target = SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 1);
        let mut transport = UdpTransport::bind(0, target).unwrap();
        let mut buf = [0u8; 64];
        assert!(transport.poll_ack(&mut buf).unwrap().is_none());
    }
}
