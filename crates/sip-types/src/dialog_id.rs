//! Dialog-ID derivation (spec §4.A, §9 "dialog ID string format" ambiguity).
//!
//! The teacher's history carries two internal formats (colon-joined and
//! semicolon-joined); this platform picks one canonical format — colon
//! joined, matching the Call-ID's own freedom to contain `;` — and uses it
//! everywhere a dialog is looked up or logged.

use std::fmt;

use crate::message::{Direction, Message};

/// `{call_id, local_tag, remote_tag}` (spec §3 Dialog entity key), with the
/// message direction that decided which tag is "local".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DialogKey {
    pub call_id: String,
    pub local_tag: String,
    pub remote_tag: String,
}

impl DialogKey {
    pub fn new(call_id: impl Into<String>, local_tag: impl Into<String>, remote_tag: impl Into<String>) -> Self {
        DialogKey { call_id: call_id.into(), local_tag: local_tag.into(), remote_tag: remote_tag.into() }
    }
}

impl fmt::Display for DialogKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.call_id, self.local_tag, self.remote_tag)
    }
}

/// Derives the dialog key for `message` given which side of the exchange we
/// are (spec §4.A): for a UAC, local = From-tag, remote = To-tag; for a UAS
/// it is reversed. Returns `None` if either tag is not yet present (e.g. a
/// pre-dialog 1xx without a to-tag).
pub fn derive(message: &Message, we_are_uac: bool) -> Option<DialogKey> {
    let (call_id, from_tag, to_tag) = match message {
        Message::Request(r) => (r.call_id()?.to_string(), r.from_header()?.tag()?.to_string(), r.to_header().and_then(|t| t.tag()).map(str::to_string)),
        Message::Response(r) => (r.call_id()?.to_string(), r.from_header()?.tag()?.to_string(), r.to_header().and_then(|t| t.tag()).map(str::to_string)),
    };
    let to_tag = to_tag?;
    let (local, remote) = if we_are_uac { (from_tag, to_tag) } else { (to_tag, from_tag) };
    Some(DialogKey::new(call_id, local, remote))
}

/// Whether `message`'s flow direction corresponds to this side sending
/// (outgoing) vs. receiving (incoming); used together with message type to
/// decide UAC vs UAS role when deriving a key (spec §3: "direction depends
/// on (message type, flow direction)").
pub fn is_uac_perspective(message: &Message, direction: Direction) -> bool {
    match message {
        Message::Request(_) => direction == Direction::Outgoing,
        Message::Response(_) => direction == Direction::Incoming,
    }
}
