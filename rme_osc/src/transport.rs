//! The [`Transport`] collaborator contract and its UDP implementation.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::time::Duration;

use rme_core::{ErrorKind, Result, RmeError};

use crate::address::AddressUri;

/// A duplex byte-packet transport. `ControlDispatcher` depends on this
/// trait, not on a concrete socket type, so it can be driven by a UDP
/// socket in production or a fake in tests.
pub trait Transport: Send {
    /// Send one packet. Must not block longer than a bounded send timeout.
    fn send(&mut self, bytes: &[u8]) -> Result<()>;

    /// Receive one packet into `buf`, returning the number of bytes
    /// written. Returns `ErrorKind::Io` on a transient read failure.
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// A UDP-backed [`Transport`], optionally bound for multicast send/receive.
pub struct UdpTransport {
    socket: UdpSocket,
    peer: SocketAddr,
}

impl UdpTransport {
    /// Bind a local socket and target `peer` for sends. If `peer`'s address
    /// is multicast, the socket joins the multicast group so it can also
    /// receive from it.
    pub fn bind(local_port: u16, peer: AddressUri) -> Result<Self> {
        let bind_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), local_port);
        let socket = UdpSocket::bind(bind_addr)
            .map_err(|e| RmeError::new(ErrorKind::Resource, "UdpTransport::bind", e.to_string()))?;
        socket
            .set_read_timeout(Some(Duration::from_millis(100)))
            .map_err(|e| RmeError::new(ErrorKind::Resource, "UdpTransport::bind", e.to_string()))?;
        if let IpAddr::V4(group) = peer.host {
            if group.is_multicast() {
                socket
                    .join_multicast_v4(&group, &Ipv4Addr::UNSPECIFIED)
                    .map_err(|e| {
                        RmeError::new(ErrorKind::Resource, "UdpTransport::bind", e.to_string())
                    })?;
            }
        }
        Ok(Self {
            socket,
            peer: SocketAddr::new(peer.host, peer.port),
        })
    }
}

impl Transport for UdpTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.socket
            .send_to(bytes, self.peer)
            .map_err(|e| RmeError::new(ErrorKind::Io, "UdpTransport::send", e.to_string()))?;
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.socket.recv(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(RmeError::new(ErrorKind::Io, "UdpTransport::recv", e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unicast_loopback_roundtrips_a_packet() {
        let peer_uri: AddressUri = "udp!127.0.0.1!0".parse().unwrap();
        let mut receiver = UdpTransport::bind(0, peer_uri).unwrap();
        let receiver_port = receiver.socket.local_addr().unwrap().port();

        let sender_peer: AddressUri = format!("udp!127.0.0.1!{receiver_port}").parse().unwrap();
        let mut sender = UdpTransport::bind(0, sender_peer).unwrap();

        sender.send(b"hello").unwrap();

        let mut buf = [0u8; 16];
        let mut received = 0;
        for _ in 0..20 {
            received = receiver.recv(&mut buf).unwrap();
            if received > 0 {
                break;
            }
        }
        assert_eq!(&buf[..received], b"hello");
    }
}
