//! Transaction error taxonomy (spec §7, "Transaction" group).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("request for method {0} carries no top Via with a branch parameter")]
    MissingVia(String),

    #[error("transaction {0} already terminated")]
    AlreadyTerminated(String),

    #[error("response status {0} is not valid in state {1}")]
    InvalidStateForResponse(u16, &'static str),

    #[error(transparent)]
    Transport(#[from] sip_transport::error::Error),
}
