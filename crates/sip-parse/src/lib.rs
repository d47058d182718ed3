//! Wire codec for SIP messages and the SDP bodies they carry (spec §4.B).
//!
//! `sip-types` defines the structured model; this crate is the only place
//! that knows how bytes on the wire map to it and back.

pub mod branch;
pub mod error;
pub mod headers;
pub mod message;
pub mod sdp;
pub mod uri;
pub mod via;

pub mod prelude {
    pub use crate::branch::{deterministic_branch, generate_branch};
    pub use crate::error::{Error, Result};
    pub use crate::message::{parse_datagram, serialize, DEFAULT_MTU_GUARD};
    pub use crate::sdp::{parse_sdp, format_sdp, MediaDescription, MediaDirection, SessionDescription};
    pub use crate::uri::parse_uri;
}
