//! Audio sinks (spec §4.G pipeline output stage). Only a null sink is
//! implemented, for the same reason `source.rs` only implements silence:
//! device playback is a platform backend outside this spec's testable
//! surface.

/// Consumes decoded PCM buffers from the inbound leg.
pub trait AudioSink: Send {
    fn accept(&mut self, samples: &[i16]);
}

/// A sink that discards everything it receives, counting frames for
/// observability/tests.
#[derive(Default)]
pub struct NullSink {
    frames_received: u64,
}

impl NullSink {
    pub fn frames_received(&self) -> u64 {
        self.frames_received
    }
}

impl AudioSink for NullSink {
    fn accept(&mut self, _samples: &[i16]) {
        self.frames_received += 1;
    }
}
