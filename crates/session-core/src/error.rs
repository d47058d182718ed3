//! The unified façade error (spec §7): wraps every lower layer's error via
//! `#[from]`, the way the teacher's `rvoip-dialog-core::api::errors` wraps
//! `sip-core`/`sip-transport` errors for its own public surface.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] sip_transport::Error),

    #[error(transparent)]
    Transaction(#[from] sip_transaction::Error),

    #[error(transparent)]
    Dialog(#[from] sip_dialog::Error),

    #[error(transparent)]
    Media(#[from] media_core::Error),

    #[error(transparent)]
    Rtp(#[from] rtp_core::Error),

    #[error("no media session registered for dialog {0:?}")]
    NoMediaSession(sip_types::dialog_id::DialogKey),

    #[error("media session is in state {state:?}, operation requires {expected:?}")]
    WrongMediaState { state: crate::media_session::MediaState, expected: crate::media_session::MediaState },

    #[error("sdp parse error: {0}")]
    SdpParse(#[from] sip_parse::error::Error),
}
