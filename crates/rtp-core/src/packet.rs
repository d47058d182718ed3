//! RTP packet encode/decode (RFC 3550 §5.1): 12-byte fixed header, no CSRC
//! list, no extension, padding bit always 0 (spec §6 Wire protocol: RTP).

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

pub type SequenceNumber = u16;
pub type RtpTimestamp = u32;
pub type Ssrc = u32;

const VERSION: u8 = 2;
const HEADER_LEN: usize = 12;

/// The fixed RTP header plus its payload (spec §4.G RTP payloader output).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpPacket {
    pub marker: bool,
    pub payload_type: u8,
    pub sequence_number: SequenceNumber,
    pub timestamp: RtpTimestamp,
    pub ssrc: Ssrc,
    pub payload: Bytes,
}

impl RtpPacket {
    pub fn new(payload_type: u8, sequence_number: SequenceNumber, timestamp: RtpTimestamp, ssrc: Ssrc, payload: Bytes) -> Self {
        RtpPacket { marker: false, payload_type, sequence_number, timestamp, ssrc, payload }
    }

    pub fn with_marker(mut self, marker: bool) -> Self {
        self.marker = marker;
        self
    }

    /// RFC 3550 §5.1 fixed header: `V(2) P(1) X(1) CC(4) | M(1) PT(7) |
    /// sequence(16) | timestamp(32) | SSRC(32)`. No CSRC, no extension.
    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.payload.len());
        buf.put_u8((VERSION << 6) | 0); // P=0, X=0, CC=0
        let marker_bit = if self.marker { 0x80 } else { 0x00 };
        buf.put_u8(marker_bit | (self.payload_type & 0x7f));
        buf.put_u16(self.sequence_number);
        buf.put_u32(self.timestamp);
        buf.put_u32(self.ssrc);
        buf.extend_from_slice(&self.payload);
        buf.freeze()
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::TooShort(bytes.len()));
        }
        let mut buf = bytes;
        let first = buf.get_u8();
        let version = first >> 6;
        if version != VERSION {
            return Err(Error::BadVersion(version));
        }
        let cc = (first & 0x0f) as usize;
        let second = buf.get_u8();
        let marker = second & 0x80 != 0;
        let payload_type = second & 0x7f;
        let sequence_number = buf.get_u16();
        let timestamp = buf.get_u32();
        let ssrc = buf.get_u32();
        // CSRC list, if present, is skipped rather than rejected: spec.md
        // §6 says "no CSRC list" for packets this crate *generates*, but an
        // inbound packet from an unknown peer may still carry one.
        let csrc_bytes = cc * 4;
        if buf.len() < csrc_bytes {
            return Err(Error::TooShort(bytes.len()));
        }
        buf.advance(csrc_bytes);
        Ok(RtpPacket { marker, payload_type, sequence_number, timestamp, ssrc, payload: Bytes::copy_from_slice(buf) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_then_parse_round_trips() {
        let packet = RtpPacket::new(8, 100, 16000, 0xdead_beef, Bytes::from_static(&[1, 2, 3, 4]));
        let wire = packet.serialize();
        assert_eq!(wire.len(), HEADER_LEN + 4);
        let parsed = RtpPacket::parse(&wire).unwrap();
        assert_eq!(parsed, packet);
    }

    #[test]
    fn marker_bit_is_isolated_from_payload_type() {
        let packet = RtpPacket::new(0, 1, 0, 1, Bytes::new()).with_marker(true);
        let wire = packet.serialize();
        assert_eq!(wire[1], 0x80);
        let parsed = RtpPacket::parse(&wire).unwrap();
        assert!(parsed.marker);
        assert_eq!(parsed.payload_type, 0);
    }

    #[test]
    fn too_short_is_rejected() {
        assert!(matches!(RtpPacket::parse(&[0u8; 4]), Err(Error::TooShort(4))));
    }

    #[test]
    fn bad_version_is_rejected() {
        let mut wire = RtpPacket::new(0, 0, 0, 0, Bytes::new()).serialize().to_vec();
        wire[0] = 0x00; // version 0
        assert!(matches!(RtpPacket::parse(&wire), Err(Error::BadVersion(0))));
    }
}
