//! Generic header storage: case-insensitive name -> typed value or list
//! (spec §3 "Headers are a case-insensitive mapping...").

use std::fmt;

use crate::headers::{CSeq, Contact, ContentType, From, RecordRoute, Route, To};
use crate::via::Via;

/// Canonical (lowercase) header names this platform treats specially.
/// Anything else round-trips as `Header::Generic`.
pub const CANON_VIA: &str = "via";
pub const CANON_FROM: &str = "from";
pub const CANON_TO: &str = "to";
pub const CANON_CONTACT: &str = "contact";
pub const CANON_CSEQ: &str = "cseq";
pub const CANON_CALL_ID: &str = "call-id";
pub const CANON_CONTENT_LENGTH: &str = "content-length";
pub const CANON_CONTENT_TYPE: &str = "content-type";
pub const CANON_MAX_FORWARDS: &str = "max-forwards";
pub const CANON_ROUTE: &str = "route";
pub const CANON_RECORD_ROUTE: &str = "record-route";
pub const CANON_EVENT: &str = "event";
pub const CANON_EXPIRES: &str = "expires";
pub const CANON_SUBJECT: &str = "subject";
pub const CANON_SUBSCRIPTION_STATE: &str = "subscription-state";
pub const CANON_SUPPORTED: &str = "supported";

/// Compact header forms expand to their canonical name on lookup
/// (spec §3: `"v" = "via"`, `"f" = "from"`, ...), per RFC 3261 §7.3.3.
pub fn expand_compact(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    match lower.as_str() {
        "v" => CANON_VIA.to_string(),
        "f" => CANON_FROM.to_string(),
        "t" => CANON_TO.to_string(),
        "m" => CANON_CONTACT.to_string(),
        "i" => CANON_CALL_ID.to_string(),
        "l" => CANON_CONTENT_LENGTH.to_string(),
        "c" => CANON_CONTENT_TYPE.to_string(),
        "s" => CANON_SUBJECT.to_string(),
        "k" => CANON_SUPPORTED.to_string(),
        "o" => CANON_EVENT.to_string(),
        other => other.to_string(),
    }
}

/// The display (title-cased, hyphen-separated) form of a canonical name,
/// used by the serializer (spec §4.B).
pub fn display_form(canon: &str) -> String {
    if canon == CANON_CALL_ID {
        return "Call-ID".to_string();
    }
    canon
        .split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(c) => c.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// One parsed header field. Multi-value headers (Via, Route, Record-Route,
/// Contact) appear as repeated entries under the same canonical name in a
/// `HeaderMap`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Header {
    Via(Via),
    From(From),
    To(To),
    Contact(Contact),
    CSeq(CSeq),
    CallId(String),
    ContentLength(u32),
    ContentType(ContentType),
    MaxForwards(u8),
    Route(Route),
    RecordRoute(RecordRoute),
    Event(String),
    Expires(u32),
    Subject(String),
    SubscriptionState(String),
    Supported(String),
    /// Unrecognized header: canonical name plus raw value.
    Generic(String, String),
}

impl Header {
    pub fn canonical_name(&self) -> String {
        match self {
            Header::Via(_) => CANON_VIA.into(),
            Header::From(_) => CANON_FROM.into(),
            Header::To(_) => CANON_TO.into(),
            Header::Contact(_) => CANON_CONTACT.into(),
            Header::CSeq(_) => CANON_CSEQ.into(),
            Header::CallId(_) => CANON_CALL_ID.into(),
            Header::ContentLength(_) => CANON_CONTENT_LENGTH.into(),
            Header::ContentType(_) => CANON_CONTENT_TYPE.into(),
            Header::MaxForwards(_) => CANON_MAX_FORWARDS.into(),
            Header::Route(_) => CANON_ROUTE.into(),
            Header::RecordRoute(_) => CANON_RECORD_ROUTE.into(),
            Header::Event(_) => CANON_EVENT.into(),
            Header::Expires(_) => CANON_EXPIRES.into(),
            Header::Subject(_) => CANON_SUBJECT.into(),
            Header::SubscriptionState(_) => CANON_SUBSCRIPTION_STATE.into(),
            Header::Supported(_) => CANON_SUPPORTED.into(),
            Header::Generic(name, _) => name.clone(),
        }
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Header::Via(v) => write!(f, "{}", v),
            Header::From(v) | Header::To(v) | Header::Contact(v) | Header::Route(v) | Header::RecordRoute(v) => {
                write!(f, "{}", v)
            }
            Header::CSeq(v) => write!(f, "{}", v),
            Header::CallId(v) => f.write_str(v),
            Header::ContentLength(v) => write!(f, "{}", v),
            Header::ContentType(v) => write!(f, "{}", v),
            Header::MaxForwards(v) => write!(f, "{}", v),
            Header::Event(v) | Header::Subject(v) | Header::SubscriptionState(v) | Header::Supported(v) => {
                f.write_str(v)
            }
            Header::Expires(v) => write!(f, "{}", v),
            Header::Generic(_, v) => f.write_str(v),
        }
    }
}

/// Case-insensitive ordered multimap of headers, preserving arrival order
/// within a name (spec §3: "Via list order is preserved").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<Header>,
}

impl HeaderMap {
    pub fn new() -> Self {
        HeaderMap { entries: Vec::new() }
    }

    pub fn push(&mut self, header: Header) {
        self.entries.push(header);
    }

    pub fn get_all(&self, name: &str) -> impl Iterator<Item = &Header> {
        let canon = expand_compact(name);
        self.entries.iter().filter(move |h| h.canonical_name() == canon)
    }

    pub fn get(&self, name: &str) -> Option<&Header> {
        self.get_all(name).next()
    }

    /// Replaces every entry under `name` with a single value, used by
    /// `set_header` (spec §4.A mutators).
    pub fn set(&mut self, name: &str, header: Header) {
        let canon = expand_compact(name);
        self.entries.retain(|h| h.canonical_name() != canon);
        self.entries.push(header);
    }

    pub fn remove(&mut self, name: &str) {
        let canon = expand_compact(name);
        self.entries.retain(|h| h.canonical_name() != canon);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
