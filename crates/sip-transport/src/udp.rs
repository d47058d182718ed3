//! The UDP transport (spec §4.C).

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use tokio::net::UdpSocket;
use tracing::{debug, trace, warn};

use sip_parse::message::{parse_datagram, serialize, DEFAULT_MTU_GUARD};
use sip_types::message::{Direction, Message, Request, Response, Source, TransportKind};
use sip_types::param::Param;
use sip_types::uri::{Host, Uri};

use crate::config::TransportConfig;
use crate::error::{Error, Result};
use crate::handler::TransportHandler;
use crate::rewrite::rewrite_top_via;

/// One UDP socket, the burst-draining receive loop, and the outbound path
/// (spec §4.C). `port = 0` in the config requests an ephemeral port, whose
/// assigned value is reported back through [`UdpTransport::local_uri`].
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    config: TransportConfig,
    assigned_port: AtomicU16,
}

impl UdpTransport {
    pub async fn bind(config: TransportConfig, handler: Arc<dyn TransportHandler>) -> Result<Arc<Self>> {
        let transport = Self::bind_unstarted(config).await?;
        transport.clone().start(handler);
        Ok(transport)
    }

    /// Binds the socket without starting the receive loop. Lets a caller
    /// whose dispatch target is itself built from the transport (the
    /// transaction manager needs an `Arc<UdpTransport>` before it can serve
    /// as a `TransportHandler`) construct both halves before wiring them
    /// together with [`UdpTransport::start`].
    pub async fn bind_unstarted(config: TransportConfig) -> Result<Arc<Self>> {
        let bind_addr = SocketAddr::new(config.listen_addr, config.listen_port);
        let socket = UdpSocket::bind(bind_addr).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::AddrInUse => Error::AddressInUse(bind_addr),
            _ => Error::Io(e),
        })?;
        let local_addr = socket.local_addr()?;
        debug!(%local_addr, "SIP UDP transport bound");

        Ok(Arc::new(UdpTransport {
            socket: Arc::new(socket),
            local_addr,
            assigned_port: AtomicU16::new(local_addr.port()),
            config,
        }))
    }

    /// Starts the burst-draining receive loop, dispatching to `handler`.
    /// Must be called exactly once per transport.
    pub fn start(self: Arc<Self>, handler: Arc<dyn TransportHandler>) {
        self.spawn_receive_loop(handler);
    }

    fn spawn_receive_loop(self: Arc<Self>, handler: Arc<dyn TransportHandler>) {
        let max_burst = self.config.max_burst.max(1);
        let sip_trace = self.config.sip_trace;
        tokio::spawn(async move {
            let mut buf = vec![0u8; 65_535];
            loop {
                match self.socket.recv_from(&mut buf).await {
                    Ok((len, remote)) => {
                        self.handle_datagram(&buf[..len], remote, sip_trace, &handler).await;
                        // Drain any further datagrams already queued without
                        // blocking, up to the configured burst cap.
                        let mut drained = 1;
                        while drained < max_burst {
                            match self.socket.try_recv_from(&mut buf) {
                                Ok((n, from)) => {
                                    self.handle_datagram(&buf[..n], from, sip_trace, &handler).await;
                                    drained += 1;
                                }
                                Err(_) => break,
                            }
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "UDP recv failed");
                    }
                }
            }
        });
    }

    async fn handle_datagram(&self, bytes: &[u8], remote: SocketAddr, sip_trace: bool, handler: &Arc<dyn TransportHandler>) {
        if sip_trace {
            trace!(bytes = %String::from_utf8_lossy(bytes), %remote, "sip_trace inbound");
        }
        let message = match parse_datagram(bytes) {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, %remote, "dropping unparsable datagram");
                return;
            }
        };
        let source = Source { local: self.local_addr, remote, transport: TransportKind::Udp, source_id: None };
        match message {
            Message::Request(mut request) => {
                rewrite_top_via(&mut request, remote);
                request.source = Some(source);
                request.direction = Direction::Incoming;
                handler.transp_request(request).await;
            }
            Message::Response(mut response) => {
                response.source = Some(source);
                response.direction = Direction::Incoming;
                handler.transp_response(response).await;
            }
        }
    }

    fn guard_mtu(bytes: &[u8]) -> Result<()> {
        if bytes.len() > DEFAULT_MTU_GUARD {
            return Err(Error::MessageTooLarge { limit: DEFAULT_MTU_GUARD, actual: bytes.len() });
        }
        Ok(())
    }

    fn resolve_destination(uri: &Uri) -> Result<SocketAddr> {
        let port = uri.port.unwrap_or(5060);
        let ip = match &uri.host {
            Host::Ipv4(a) => std::net::IpAddr::V4(*a),
            Host::Ipv6(a) => std::net::IpAddr::V6(*a),
            Host::Hostname(h) => return Err(Error::InvalidDestination(format!("{}:{} (hostname resolution out of scope)", h, port))),
        };
        Ok(SocketAddr::new(ip, port))
    }

    /// Serializes and sends an outbound request to its request-URI, or to
    /// `next_hop` when the dialog/route layer supplies one (e.g. the first
    /// Route entry).
    pub async fn send_request(&self, request: &Request, next_hop: Option<SocketAddr>) -> Result<()> {
        let wire = serialize(&Message::Request(request.clone()));
        Self::guard_mtu(&wire)?;
        let destination = match next_hop {
            Some(addr) => addr,
            None => Self::resolve_destination(&request.uri)?,
        };
        self.socket.send_to(&wire, destination).await?;
        if self.config.sip_trace {
            trace!(%destination, "sip_trace outbound request");
        }
        Ok(())
    }

    pub async fn send_response(&self, response: &Response, destination: SocketAddr) -> Result<()> {
        let wire = serialize(&Message::Response(response.clone()));
        Self::guard_mtu(&wire)?;
        self.socket.send_to(&wire, destination).await?;
        if self.config.sip_trace {
            trace!(%destination, "sip_trace outbound response");
        }
        Ok(())
    }

    /// The contact-able `sip:` URI for this transport, with its actually
    /// bound (possibly ephemeral) port (spec §4.C `local_uri()`).
    pub fn local_uri(&self) -> Uri {
        let host = self
            .config
            .exposed_addr
            .unwrap_or(self.local_addr.ip());
        let port = self.config.exposed_port.unwrap_or(self.assigned_port.load(Ordering::Relaxed));
        Uri::sip(host.to_string()).with_port(port).with_parameter(Param::new("transport", Some("udp".into())))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}
