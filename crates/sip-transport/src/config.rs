//! Per-transport configuration (spec §6 "Per-transport" options).

use std::net::IpAddr;

/// Read-only after a [`crate::UdpTransport`] is built from it (spec §5:
/// "Configuration: read-only after startup").
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub listen_addr: IpAddr,
    /// `0` requests an OS-assigned ephemeral port.
    pub listen_port: u16,
    /// Address advertised in Via/Contact when behind NAT; defaults to
    /// `listen_addr` when unset.
    pub exposed_addr: Option<IpAddr>,
    pub exposed_port: Option<u16>,
    /// How many queued datagrams are drained per wake (spec §4.C).
    pub max_burst: usize,
    /// Gates the raw wire-message dump (spec §4.C "Observability").
    pub sip_trace: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            listen_addr: IpAddr::from([0, 0, 0, 0]),
            listen_port: 0,
            exposed_addr: None,
            exposed_port: None,
            max_burst: 10,
            sip_trace: false,
        }
    }
}
