//! The bidirectional RTP UDP endpoint (spec §4.G "UDP endpoint: binds the
//! local RTP port, sends to remote address, receives inbound RTP").

use std::net::{IpAddr, SocketAddr};

use tokio::net::UdpSocket;
use tracing::{trace, warn};

use crate::error::Result;
use crate::packet::RtpPacket;

/// One bound RTP socket. A media session owns exactly one of these per
/// direction pair, mirroring the teacher's `RtpScheduler`/transport split:
/// this type is the transport half, with no scheduling or codec logic.
pub struct RtpSocket {
    socket: UdpSocket,
    remote: Option<SocketAddr>,
}

impl RtpSocket {
    /// Binds a local RTP port. `port = 0` requests an OS-assigned ephemeral
    /// port, used by the allocator's probe-open-close strategy.
    pub async fn bind(local_addr: IpAddr, port: u16) -> Result<Self> {
        let socket = UdpSocket::bind(SocketAddr::new(local_addr, port)).await?;
        Ok(RtpSocket { socket, remote: None })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub fn set_remote(&mut self, remote: SocketAddr) {
        self.remote = Some(remote);
    }

    /// Sends to the configured remote, if one is set; otherwise a no-op
    /// logged at `warn!` (a pipeline started before the answer is applied
    /// would hit this, which is a caller bug, not a transport error).
    pub async fn send(&self, packet: &RtpPacket) -> Result<()> {
        let Some(remote) = self.remote else {
            warn!("dropping outbound RTP packet, no remote address set yet");
            return Ok(());
        };
        let wire = packet.serialize();
        self.socket.send_to(&wire, remote).await?;
        trace!(%remote, seq = packet.sequence_number, "sent RTP packet");
        Ok(())
    }

    /// Receives one datagram and parses it as RTP. Malformed datagrams are
    /// logged and the caller should retry, consistent with spec §7's
    /// "parsing errors ... are logged and dropped" propagation policy.
    pub async fn recv(&self, buf: &mut [u8]) -> Result<Option<(RtpPacket, SocketAddr)>> {
        let (len, from) = self.socket.recv_from(buf).await?;
        match RtpPacket::parse(&buf[..len]) {
            Ok(packet) => Ok(Some((packet, from))),
            Err(e) => {
                warn!(error = %e, %from, "dropping unparsable RTP datagram");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[tokio::test]
    async fn send_then_recv_round_trips() {
        let mut a = RtpSocket::bind("127.0.0.1".parse().unwrap(), 0).await.unwrap();
        let b = RtpSocket::bind("127.0.0.1".parse().unwrap(), 0).await.unwrap();
        a.set_remote(b.local_addr().unwrap());

        let packet = RtpPacket::new(8, 1, 160, 0x1234, Bytes::from_static(&[9, 9, 9]));
        a.send(&packet).await.unwrap();

        let mut buf = [0u8; 1500];
        let (received, from) = b.recv(&mut buf).await.unwrap().unwrap();
        assert_eq!(received, packet);
        assert_eq!(from, a.local_addr().unwrap());
    }

    #[tokio::test]
    async fn bound_port_is_ephemeral_and_valid() {
        let socket = RtpSocket::bind("127.0.0.1".parse().unwrap(), 0).await.unwrap();
        assert!(socket.local_addr().unwrap().port() >= 1024);
    }
}
