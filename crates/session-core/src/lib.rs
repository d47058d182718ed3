//! UAC/UAS handler façade, media session lifecycle, SDP negotiation, and
//! the process-wide registry tying the stack together (spec §4.F/§4.G and
//! the glue layer: registry, configuration, and the top-level
//! `UserAgent`).

pub mod config;
pub mod error;
pub mod handler;
pub mod media_session;
pub mod negotiation;
pub mod port_allocator;
pub mod registry;
pub mod user_agent;

pub use config::Config;
pub use error::{Error, Result};
pub use handler::{DefaultUacHandler, DefaultUasHandler, UacAckAction, UacHandler, UacRedirectAction, UasAction, UasHandler};
pub use media_session::{MediaSession, MediaState, Role};
pub use registry::MediaRegistry;
pub use user_agent::UserAgent;
