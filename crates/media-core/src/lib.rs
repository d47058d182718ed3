//! The media plane: codec table, frame chunker, RTP payloader, realtime
//! pacer, and pipeline orchestration for one negotiated audio stream (spec
//! §4.G).

pub mod chunker;
pub mod codec;
pub mod error;
pub mod pacer;
pub mod payloader;
pub mod pipeline;
pub mod sink;
pub mod source;

pub use chunker::{Chunker, Frame};
pub use codec::AudioCodec;
pub use error::{Error, Result};
pub use pacer::Pacer;
pub use payloader::Payloader;
pub use pipeline::{spawn, MediaPipeline};
pub use sink::{AudioSink, NullSink};
pub use source::{AudioSource, SilenceSource};
