//! Transport error taxonomy (spec §7, "Transport" group).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("address already in use: {0}")]
    AddressInUse(std::net::SocketAddr),

    #[error("port already in use")]
    PortInUse,

    #[error("serialized message of {actual} bytes exceeds the MTU guard of {limit} bytes")]
    MessageTooLarge { limit: usize, actual: usize },

    #[error("connection refused")]
    ConnectionRefused,

    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    #[error("no transport configured for {0}")]
    NoTransport(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Parse(#[from] sip_parse::error::Error),
}
