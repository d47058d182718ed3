//! Wire-level error taxonomy (spec §7, "Parsing" group).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("missing start line")]
    MissingStartLine,

    #[error("bad method: {0}")]
    BadMethod(String),

    #[error("bad status line: {0}")]
    BadStatus(String),

    #[error("bad Via header: {0}")]
    BadVia(String),

    #[error("bad CSeq header: {0}")]
    BadCSeq(String),

    #[error("bad URI: {0}")]
    BadUri(String),

    #[error("missing required header: {0}")]
    MissingRequiredHeader(&'static str),

    #[error("Content-Length mismatch: header said {declared}, body is {actual} bytes")]
    ContentLengthMismatch { declared: usize, actual: usize },

    #[error("malformed header {name}: {value}")]
    BadHeader { name: String, value: String },

    #[error("message exceeds MTU guard of {limit} bytes (was {actual})")]
    MessageTooLarge { limit: usize, actual: usize },
}

impl From<sip_types::error::Error> for Error {
    fn from(e: sip_types::error::Error) -> Self {
        match e {
            sip_types::error::Error::BadMethod(m) => Error::BadMethod(m),
            sip_types::error::Error::BadVia(v) => Error::BadVia(v),
            sip_types::error::Error::BadUri(u) => Error::BadUri(u),
            sip_types::error::Error::MissingBranch(h) => Error::MissingRequiredHeader(h),
            sip_types::error::Error::NonCompliantBranch(b) => Error::BadVia(b),
            other => Error::BadHeader { name: "unknown".into(), value: other.to_string() },
        }
    }
}
