//! RTP payloader (spec §4.G): turns one encoded frame into one `RtpPacket`,
//! carrying the sequence/timestamp/SSRC state a session holds across its
//! whole lifetime.

use bytes::Bytes;
use rand::Rng;
use rtp_core::{PayloadType, RtpPacket, RtpTimestamp, SequenceNumber, Ssrc};

/// Per-session payloader state (spec §4.G invariants): sequence number
/// starts at a random value and increments by 1 per packet; timestamp
/// advances by the codec's samples-per-frame; SSRC is chosen once and held
/// fixed for the session's lifetime; the marker bit is set only on the
/// first packet sent after a silence gap (a talkspurt's first packet).
pub struct Payloader {
    payload_type: PayloadType,
    sequence_number: SequenceNumber,
    timestamp: RtpTimestamp,
    ssrc: Ssrc,
    samples_per_frame: u32,
    at_talkspurt_start: bool,
}

impl Payloader {
    pub fn new(payload_type: PayloadType) -> Self {
        let mut rng = rand::thread_rng();
        Payloader {
            payload_type,
            sequence_number: rng.gen(),
            timestamp: rng.gen(),
            ssrc: rng.gen(),
            samples_per_frame: payload_type.samples_per_20ms(),
            at_talkspurt_start: true,
        }
    }

    pub fn ssrc(&self) -> Ssrc {
        self.ssrc
    }

    /// Marks the next packet as the start of a new talkspurt (spec §4.G:
    /// after the source resumes from a pause or silence gap).
    pub fn mark_talkspurt_start(&mut self) {
        self.at_talkspurt_start = true;
    }

    pub fn payload(&mut self, encoded: Vec<u8>) -> RtpPacket {
        let marker = self.at_talkspurt_start;
        self.at_talkspurt_start = false;

        let packet = RtpPacket::new(self.payload_type.number(), self.sequence_number, self.timestamp, self.ssrc, Bytes::from(encoded))
            .with_marker(marker);

        self.sequence_number = self.sequence_number.wrapping_add(1);
        self.timestamp = self.timestamp.wrapping_add(self.samples_per_frame);
        packet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_packet_after_construction_is_marked() {
        let mut payloader = Payloader::new(PayloadType::Pcma);
        let packet = payloader.payload(vec![0xffu8; 160]);
        assert!(packet.marker);
        let next = payloader.payload(vec![0xffu8; 160]);
        assert!(!next.marker);
    }

    #[test]
    fn sequence_and_timestamp_advance_by_fixed_steps() {
        let mut payloader = Payloader::new(PayloadType::Pcma);
        let first = payloader.payload(vec![0u8; 160]);
        let second = payloader.payload(vec![0u8; 160]);
        assert_eq!(second.sequence_number, first.sequence_number.wrapping_add(1));
        assert_eq!(second.timestamp, first.timestamp.wrapping_add(160));
        assert_eq!(second.ssrc, first.ssrc);
    }

    #[test]
    fn talkspurt_restart_remarks_the_next_packet() {
        let mut payloader = Payloader::new(PayloadType::Pcma);
        payloader.payload(vec![0u8; 160]);
        payloader.mark_talkspurt_start();
        let packet = payloader.payload(vec![0u8; 160]);
        assert!(packet.marker);
    }
}
