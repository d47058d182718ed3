//! The codec table (spec §4.G "minimum: PCMA, PCMU, Opus") and the
//! encode/decode seam every pipeline stage is built around, grounded on the
//! teacher's `codec-core::types::AudioCodec` trait shape.

pub mod g711;
#[cfg(feature = "opus")]
pub mod opus_codec;

use rtp_core::PayloadType;

use crate::error::Result;

/// One codec instance, bound to a specific frame size. Implementations are
/// stateless for G.711 and stateful for Opus (the encoder keeps an internal
/// state machine across frames per RFC 6716).
pub trait AudioCodec: Send {
    /// Encodes exactly one frame (`frame_samples()` samples per channel).
    fn encode(&mut self, samples: &[i16]) -> Result<Vec<u8>>;

    /// Decodes one payload back into PCM samples.
    fn decode(&mut self, payload: &[u8]) -> Result<Vec<i16>>;

    fn payload_type(&self) -> PayloadType;

    /// Samples per channel in one 20 ms frame at this codec's clock rate.
    fn frame_samples(&self) -> usize {
        self.payload_type().samples_per_20ms() as usize
    }
}

/// Builds a codec instance for a payload type (spec §4.G pipeline setup:
/// "The controller is polymorphic over ... {selected codec, ...}").
pub fn build(payload_type: PayloadType) -> Result<Box<dyn AudioCodec>> {
    match payload_type {
        PayloadType::Pcmu => Ok(Box::new(g711::G711Codec::mu_law())),
        PayloadType::Pcma => Ok(Box::new(g711::G711Codec::a_law())),
        #[cfg(feature = "opus")]
        PayloadType::Opus => Ok(Box::new(opus_codec::OpusCodec::new()?)),
        #[cfg(not(feature = "opus"))]
        PayloadType::Opus => Err(crate::error::Error::UnsupportedCodec(PayloadType::Opus.number())),
    }
}

/// Codecs this platform supports, in preference order (spec §6
/// `supported_codecs`'s default when a session doesn't override it).
pub const DEFAULT_PREFERENCE: [PayloadType; 3] = [PayloadType::Pcma, PayloadType::Pcmu, PayloadType::Opus];

/// Intersects an offer's advertised payload types against a local
/// preference list, keeping the local order (spec §4.G "intersect with
/// local supported codecs ... pick by local preference order").
pub fn select_codec(offered: &[u8], local_preference: &[PayloadType]) -> Option<PayloadType> {
    local_preference.iter().copied().find(|pt| offered.contains(&pt.number()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_first_local_preference_present_in_offer() {
        let offered = [0u8, 8u8]; // PCMU, PCMA
        let chosen = select_codec(&offered, &DEFAULT_PREFERENCE);
        assert_eq!(chosen, Some(PayloadType::Pcma)); // PCMA is first in DEFAULT_PREFERENCE
    }

    #[test]
    fn no_overlap_returns_none() {
        let offered = [111u8]; // Opus only
        let chosen = select_codec(&offered, &[PayloadType::Pcma, PayloadType::Pcmu]);
        assert_eq!(chosen, None);
    }
}
