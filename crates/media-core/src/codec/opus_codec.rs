//! Opus (RFC 6716) via the real `opus` crate, feature-gated the same way
//! the teacher's `codec-core::codecs::opus` wraps libopus. Simplified to a
//! fixed VoIP-application mono encoder/decoder rather than the teacher's
//! fully configurable `OpusConfig` (bitrate/VBR/complexity/DTX/FEC knobs) —
//! none of those are named by this spec.
//!
//! RFC 7587 fixes Opus's SDP `rtpmap` clock rate at 48000 and channel count
//! at 2 regardless of the actual encoded channel count, which is why
//! `PayloadType::Opus::channels()` reports 2 even though this encoder runs
//! mono internally.

use opus::{Application, Channels, Decoder, Encoder};
use rtp_core::PayloadType;

use crate::codec::AudioCodec;
use crate::error::{Error, Result};

const SAMPLE_RATE: u32 = 48_000;
const FRAME_SAMPLES: usize = 960; // 20 ms at 48 kHz

pub struct OpusCodec {
    encoder: Encoder,
    decoder: Decoder,
}

impl OpusCodec {
    pub fn new() -> Result<Self> {
        let encoder = Encoder::new(SAMPLE_RATE, Channels::Mono, Application::Voip)
            .map_err(|e| Error::Codec(e.to_string()))?;
        let decoder = Decoder::new(SAMPLE_RATE, Channels::Mono).map_err(|e| Error::Codec(e.to_string()))?;
        Ok(OpusCodec { encoder, decoder })
    }
}

impl AudioCodec for OpusCodec {
    fn encode(&mut self, samples: &[i16]) -> Result<Vec<u8>> {
        let mut out = vec![0u8; 4000]; // libopus's documented worst-case packet size
        let len = self.encoder.encode(samples, &mut out).map_err(|e| Error::Codec(e.to_string()))?;
        out.truncate(len);
        Ok(out)
    }

    fn decode(&mut self, payload: &[u8]) -> Result<Vec<i16>> {
        let mut out = vec![0i16; FRAME_SAMPLES];
        let len = self.decoder.decode(payload, &mut out, false).map_err(|e| Error::Codec(e.to_string()))?;
        out.truncate(len);
        Ok(out)
    }

    fn payload_type(&self) -> PayloadType {
        PayloadType::Opus
    }

    fn frame_samples(&self) -> usize {
        FRAME_SAMPLES
    }
}
