//! Media error taxonomy (spec §7 SDP/Media group).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("no codec in common between the offer and the supported list")]
    NoCommonCodec,

    #[error("offer carries no audio media section")]
    NoAudioMedia,

    #[error("could not allocate an RTP port after {attempts} attempts")]
    PortAllocationFailed { attempts: u32 },

    #[error("pipeline failed to start: {0}")]
    PipelineStartFailed(String),

    #[error("codec {0} is not in the supported table")]
    UnsupportedCodec(u8),

    #[error(transparent)]
    Rtp(#[from] rtp_core::Error),

    #[error("encoder/decoder error: {0}")]
    Codec(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
