//! Typed representation of SIP messages and headers (spec §4.A).
//!
//! This crate has no knowledge of the wire format — parsing and
//! serialization live in `sip-parse`. It defines the structured data model
//! that the rest of the platform builds on: [`message::Request`] /
//! [`message::Response`], typed headers, [`uri::Uri`], and the dialog-ID
//! derivation helper used by both the dialog layer and the façade.

pub mod dialog_id;
pub mod error;
pub mod header;
pub mod headers;
pub mod method;
pub mod param;
pub mod status;
pub mod uri;
pub mod via;

pub mod message;

pub mod prelude {
    pub use crate::dialog_id::{derive as derive_dialog_key, DialogKey};
    pub use crate::error::{Error, Result};
    pub use crate::header::{Header, HeaderMap};
    pub use crate::headers::{CSeq, Contact, ContentType, From, NamedAddress, RecordRoute, Route, To};
    pub use crate::message::{reply, Direction, Message, Request, Response, Source, TransportKind};
    pub use crate::method::Method;
    pub use crate::param::Param;
    pub use crate::status::StatusCode;
    pub use crate::uri::{Host, Scheme, Uri};
    pub use crate::via::Via;
}
