//! Typed headers beyond Via (spec §3 "Typed headers" / §4.A).

use std::fmt;

use crate::param::Param;
use crate::uri::Uri;

/// Shared shape of From/To/Contact/Route/Record-Route:
/// `["display-name"] <uri>;params`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedAddress {
    pub display_name: Option<String>,
    pub uri: Uri,
    pub params: Vec<Param>,
}

impl NamedAddress {
    pub fn new(display_name: Option<String>, uri: Uri) -> Self {
        NamedAddress { display_name, uri, params: Vec::new() }
    }

    pub fn tag(&self) -> Option<&str> {
        crate::param::find_value(&self.params, "tag")
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        crate::param::set(&mut self.params, "tag", Some(tag.into()));
        self
    }
}

impl fmt::Display for NamedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.display_name {
            write!(f, "\"{}\" <{}>", name, self.uri)?;
        } else {
            write!(f, "<{}>", self.uri)?;
        }
        for p in &self.params {
            write!(f, ";{}", p)?;
        }
        Ok(())
    }
}

pub type From = NamedAddress;
pub type To = NamedAddress;
pub type Contact = NamedAddress;
pub type Route = NamedAddress;
pub type RecordRoute = NamedAddress;

/// `CSeq: <non-negative integer> <method>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CSeq {
    pub seq: u32,
    pub method: crate::method::Method,
}

impl fmt::Display for CSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.seq, self.method)
    }
}

/// `Content-Type: type/subtype;params`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    pub media_type: String,
    pub media_subtype: String,
    pub params: Vec<Param>,
}

impl ContentType {
    pub fn sdp() -> Self {
        ContentType { media_type: "application".into(), media_subtype: "sdp".into(), params: Vec::new() }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.media_type, self.media_subtype)?;
        for p in &self.params {
            write!(f, ";{}", p)?;
        }
        Ok(())
    }
}
