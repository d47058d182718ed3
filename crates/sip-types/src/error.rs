//! Error taxonomy for the message and header model (spec §7, Parsing group).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or inspecting typed SIP messages and headers.
///
/// The `sip-parse` crate adds its own wire-level variants on top of these;
/// this set is what can go wrong purely from the structured-data side.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid SIP method: {0}")]
    BadMethod(String),

    #[error("invalid status code: {0}")]
    BadStatus(u16),

    #[error("invalid Via header: {0}")]
    BadVia(String),

    #[error("invalid CSeq header: {0}")]
    BadCSeq(String),

    #[error("invalid URI: {0}")]
    BadUri(String),

    #[error("missing required header: {0}")]
    MissingRequiredHeader(&'static str),

    #[error("header {0} does not carry a branch parameter")]
    MissingBranch(&'static str),

    #[error("branch {0:?} does not begin with the RFC 3261 magic cookie z9hG4bK")]
    NonCompliantBranch(String),
}
