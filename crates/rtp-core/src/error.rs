//! RTP error taxonomy (spec §7 SDP/Media group, the RTP-specific subset).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("RTP packet shorter than the 12-byte fixed header: {0} bytes")]
    TooShort(usize),

    #[error("RTP version {0} is not 2")]
    BadVersion(u8),

    #[error("payload type {0} is not in the supported table (0, 8, 111)")]
    UnsupportedPayloadType(u8),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
