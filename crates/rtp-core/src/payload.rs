//! The static/dynamic payload type table spec.md §4.G and §6 name: PCMU (0),
//! PCMA (8), and dynamic Opus (111).

/// One entry in the supported payload type table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadType {
    Pcmu,
    Pcma,
    Opus,
}

impl PayloadType {
    /// The numeric RTP payload type carried in the packet header.
    pub const fn number(self) -> u8 {
        match self {
            PayloadType::Pcmu => 0,
            PayloadType::Pcma => 8,
            PayloadType::Opus => 111,
        }
    }

    pub const fn clock_rate(self) -> u32 {
        match self {
            PayloadType::Pcmu | PayloadType::Pcma => 8_000,
            PayloadType::Opus => 48_000,
        }
    }

    pub const fn channels(self) -> u8 {
        match self {
            PayloadType::Pcmu | PayloadType::Pcma => 1,
            PayloadType::Opus => 2,
        }
    }

    /// Samples per 20 ms frame at this payload's clock rate (spec §4.G:
    /// 160 for G.711, 960 for Opus).
    pub const fn samples_per_20ms(self) -> u32 {
        self.clock_rate() / 50
    }

    pub const fn rtpmap_encoding(self) -> &'static str {
        match self {
            PayloadType::Pcmu => "PCMU",
            PayloadType::Pcma => "PCMA",
            PayloadType::Opus => "opus",
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            0 => Some(PayloadType::Pcmu),
            8 => Some(PayloadType::Pcma),
            111 => Some(PayloadType::Opus),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn g711_frame_is_160_samples() {
        assert_eq!(PayloadType::Pcma.samples_per_20ms(), 160);
        assert_eq!(PayloadType::Pcmu.samples_per_20ms(), 160);
    }

    #[test]
    fn opus_frame_is_960_samples() {
        assert_eq!(PayloadType::Opus.samples_per_20ms(), 960);
    }

    #[test]
    fn number_round_trips() {
        for pt in [PayloadType::Pcmu, PayloadType::Pcma, PayloadType::Opus] {
            assert_eq!(PayloadType::from_number(pt.number()), Some(pt));
        }
    }
}
