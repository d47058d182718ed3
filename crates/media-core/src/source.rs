//! Audio sources (spec §4.G pipeline input stage). Only a silence generator
//! is implemented: file/device capture are named in the pipeline's stage
//! list as logical positions in the original system, not as testable
//! requirements of this spec, so no WAV reader or platform audio backend is
//! built here.

/// Produces PCM buffers. `next` returns `None` once the source is exhausted
/// (silence never exhausts; it is meant for hold music / comfort noise /
/// test fixtures).
pub trait AudioSource: Send {
    fn next(&mut self, sample_count: usize) -> Option<Vec<i16>>;
}

/// A source that always yields `sample_count` zero samples.
pub struct SilenceSource;

impl AudioSource for SilenceSource {
    fn next(&mut self, sample_count: usize) -> Option<Vec<i16>> {
        Some(vec![0i16; sample_count])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_source_never_exhausts() {
        let mut source = SilenceSource;
        for _ in 0..3 {
            let buf = source.next(160).unwrap();
            assert_eq!(buf, vec![0i16; 160]);
        }
    }
}
