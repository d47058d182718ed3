//! G.711 (ITU-T) PCMU/PCMA: the two 8 kHz, one-byte-per-sample logarithmic
//! codecs spec §4.G names as the mandatory minimum. Encode/decode follow the
//! standard formulas directly rather than the teacher's SIMD/lookup-table
//! fast paths (`codec-core::codecs::g711`'s `encode_mulaw_optimized` and
//! friends) — this workspace has no throughput requirement that justifies
//! that complexity.

use rtp_core::PayloadType;

use crate::codec::AudioCodec;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Law {
    Mu,
    A,
}

pub struct G711Codec {
    law: Law,
    payload_type: PayloadType,
}

impl G711Codec {
    pub fn mu_law() -> Self {
        G711Codec { law: Law::Mu, payload_type: PayloadType::Pcmu }
    }

    pub fn a_law() -> Self {
        G711Codec { law: Law::A, payload_type: PayloadType::Pcma }
    }
}

impl AudioCodec for G711Codec {
    fn encode(&mut self, samples: &[i16]) -> Result<Vec<u8>> {
        Ok(samples.iter().map(|&s| match self.law {
            Law::Mu => linear_to_mulaw(s),
            Law::A => linear_to_alaw(s),
        }).collect())
    }

    fn decode(&mut self, payload: &[u8]) -> Result<Vec<i16>> {
        Ok(payload.iter().map(|&b| match self.law {
            Law::Mu => mulaw_to_linear(b),
            Law::A => alaw_to_linear(b),
        }).collect())
    }

    fn payload_type(&self) -> PayloadType {
        self.payload_type
    }
}

const MULAW_BIAS: i32 = 0x84;
const MULAW_CLIP: i32 = 32635;

/// ITU-T G.711 §mu-law encode: bias, clip, find the exponent segment, pack
/// sign/exponent/mantissa into one byte, then invert (mu-law is sent
/// inverted on the wire).
fn linear_to_mulaw(sample: i16) -> u8 {
    let sign = if sample < 0 { 0x80 } else { 0x00 };
    let mut magnitude = if sample < 0 { -(sample as i32) } else { sample as i32 };
    magnitude = magnitude.min(MULAW_CLIP) + MULAW_BIAS;

    let exponent = (0..8).rev().find(|&e| magnitude >> (e + 3) != 0).unwrap_or(0);
    let mantissa = (magnitude >> (exponent + 3)) & 0x0f;
    let byte = sign | (exponent << 4) as u8 | mantissa as u8;
    !byte
}

fn mulaw_to_linear(byte: u8) -> i16 {
    let byte = !byte;
    let sign = byte & 0x80;
    let exponent = ((byte >> 4) & 0x07) as i32;
    let mantissa = (byte & 0x0f) as i32;
    let magnitude = ((mantissa << 3) + MULAW_BIAS) << exponent;
    let magnitude = magnitude - MULAW_BIAS;
    if sign != 0 { -(magnitude as i16) } else { magnitude as i16 }
}

const ALAW_CLIP: i32 = 32635;

/// ITU-T G.711 A-law encode: same segment/mantissa structure as mu-law but
/// without the bias term, and the sign/even bits are XORed with 0x55 before
/// transmission per the standard.
fn linear_to_alaw(sample: i16) -> u8 {
    let mut sample = sample as i32;
    let sign = if sample < 0 { 0x80 } else { 0x00 };
    if sample < 0 {
        sample = -sample;
    }
    sample = sample.min(ALAW_CLIP);

    let byte = if sample < 256 {
        (sample >> 4) as u8
    } else {
        let exponent = (1..8).rev().find(|&e| sample >> (e + 3) != 0).unwrap_or(1);
        let mantissa = (sample >> (exponent + 3)) & 0x0f;
        ((exponent as u8) << 4) | mantissa as u8
    };
    (byte | sign) ^ 0x55
}

fn alaw_to_linear(byte: u8) -> i16 {
    let byte = byte ^ 0x55;
    let sign = byte & 0x80;
    let exponent = ((byte >> 4) & 0x07) as i32;
    let mantissa = (byte & 0x0f) as i32;

    let magnitude = if exponent == 0 {
        (mantissa << 4) + 8
    } else {
        ((mantissa << 4) + 0x108) << (exponent - 1)
    };
    if sign != 0 { -(magnitude as i16) } else { magnitude as i16 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mulaw_round_trip_is_close_to_original() {
        let mut codec = G711Codec::mu_law();
        for sample in [-30000i16, -1000, -1, 0, 1, 1000, 30000] {
            let encoded = codec.encode(&[sample]).unwrap();
            let decoded = codec.decode(&encoded).unwrap()[0];
            // Logarithmic companding is lossy; the law guarantees a bounded
            // relative error, not exact reconstruction.
            assert!((decoded as i32 - sample as i32).abs() < 1100, "sample {sample} decoded to {decoded}");
        }
    }

    #[test]
    fn alaw_round_trip_is_close_to_original() {
        let mut codec = G711Codec::a_law();
        for sample in [-30000i16, -1000, -1, 0, 1, 1000, 30000] {
            let encoded = codec.encode(&[sample]).unwrap();
            let decoded = codec.decode(&encoded).unwrap()[0];
            assert!((decoded as i32 - sample as i32).abs() < 1100, "sample {sample} decoded to {decoded}");
        }
    }

    #[test]
    fn silence_encodes_to_a_fixed_byte() {
        let mut mu = G711Codec::mu_law();
        let encoded = mu.encode(&[0, 0, 0]).unwrap();
        assert!(encoded.iter().all(|&b| b == encoded[0]));
    }

    #[test]
    fn frame_size_matches_payload_type_table() {
        assert_eq!(G711Codec::mu_law().frame_samples(), 160);
        assert_eq!(G711Codec::a_law().frame_samples(), 160);
    }
}
