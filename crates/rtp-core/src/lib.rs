//! RFC 3550 RTP: the fixed-header packet codec, a bidirectional UDP
//! endpoint, and the static/dynamic payload type table (spec §4.G RTP
//! payloader / UDP endpoint, §6 Wire protocol: RTP).

pub mod error;
pub mod packet;
pub mod payload;
pub mod socket;

pub use error::{Error, Result};
pub use packet::{RtpPacket, RtpTimestamp, SequenceNumber, Ssrc};
pub use payload::PayloadType;
pub use socket::RtpSocket;
