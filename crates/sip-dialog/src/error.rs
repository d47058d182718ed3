//! Dialog error taxonomy (spec §7, "Dialog" group).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("response is not dialog-establishing (not a 1xx-with-tag or 2xx)")]
    NotDialogEstablishing,

    #[error("message is missing a header required to derive a dialog: {0}")]
    MissingHeader(&'static str),

    #[error("no dialog matches call-id {call_id:?} local-tag {local_tag:?} remote-tag {remote_tag:?}")]
    NoSuchDialog { call_id: String, local_tag: String, remote_tag: String },

    #[error("in-dialog request CSeq {got} is not greater than the last-seen {expected}, per RFC 3261 §12.2.2")]
    OutOfOrderRequest { expected: u32, got: u32 },

    #[error("dialog is terminated")]
    Terminated,
}
