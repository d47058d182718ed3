//! Request/Response message model (spec §3 "Message", §4.A constructors).

use std::net::SocketAddr;

use crate::header::{Header, HeaderMap, CANON_CALL_ID};
use crate::headers::{CSeq, Contact, ContentType, From, To};
use crate::method::Method;
use crate::status::StatusCode;
use crate::uri::Uri;
use crate::via::Via;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Udp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Incoming,
    Outgoing,
}

/// Source/destination metadata attached by the transport layer (spec §3,
/// §4.C `Source{local, remote, transport}`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub local: SocketAddr,
    pub remote: SocketAddr,
    pub transport: TransportKind,
    pub source_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub uri: Uri,
    pub version: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub source: Option<Source>,
    pub direction: Direction,
    pub transaction_id: Option<String>,
    pub dialog_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub reason: String,
    pub version: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub source: Option<Source>,
    pub direction: Direction,
    pub transaction_id: Option<String>,
    pub dialog_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Request(Request),
    Response(Response),
}

impl Request {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        Request {
            method,
            uri,
            version: "SIP/2.0".into(),
            headers,
            body: Vec::new(),
            source: None,
            direction: Direction::Outgoing,
            transaction_id: None,
            dialog_id: None,
        }
    }

    pub fn from_header(&self) -> Option<&From> {
        self.headers.get(CANON_FROM_COMPACT).and_then(as_named)
    }

    pub fn to_header(&self) -> Option<&To> {
        self.headers.get("to").and_then(as_named)
    }

    pub fn call_id(&self) -> Option<&str> {
        self.headers.get(CANON_CALL_ID).and_then(|h| match h {
            Header::CallId(v) => Some(v.as_str()),
            _ => None,
        })
    }

    pub fn cseq(&self) -> Option<&CSeq> {
        self.headers.get("cseq").and_then(|h| match h {
            Header::CSeq(c) => Some(c),
            _ => None,
        })
    }

    pub fn top_via(&self) -> Option<&Via> {
        self.headers.get("via").and_then(|h| match h {
            Header::Via(v) => Some(v),
            _ => None,
        })
    }

    pub fn all_vias(&self) -> Vec<&Via> {
        self.headers
            .get_all("via")
            .filter_map(|h| match h {
                Header::Via(v) => Some(v),
                _ => None,
            })
            .collect()
    }

    pub fn branch(&self) -> Option<&str> {
        self.top_via().and_then(|v| v.branch())
    }

    pub fn contact(&self) -> Option<&Contact> {
        self.headers.get("contact").and_then(as_named)
    }

    pub fn max_forwards(&self) -> Option<u8> {
        self.headers.get("max-forwards").and_then(|h| match h {
            Header::MaxForwards(v) => Some(*v),
            _ => None,
        })
    }

    pub fn set_header(&mut self, name: &str, header: Header) {
        self.headers.set(name, header);
    }

    /// Replaces the body and recomputes Content-Length (spec §3 invariant).
    pub fn set_body(&mut self, body: Vec<u8>, content_type: Option<ContentType>) {
        let len = body.len() as u32;
        self.body = body;
        self.headers.set("content-length", Header::ContentLength(len));
        if let Some(ct) = content_type {
            self.headers.set("content-type", Header::ContentType(ct));
        }
    }
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        let reason = status.default_reason().to_string();
        Response {
            status,
            reason,
            version: "SIP/2.0".into(),
            headers: HeaderMap::new(),
            body: Vec::new(),
            source: None,
            direction: Direction::Outgoing,
            transaction_id: None,
            dialog_id: None,
        }
    }

    pub fn from_header(&self) -> Option<&From> {
        self.headers.get("from").and_then(as_named)
    }

    pub fn to_header(&self) -> Option<&To> {
        self.headers.get("to").and_then(as_named)
    }

    pub fn call_id(&self) -> Option<&str> {
        self.headers.get(CANON_CALL_ID).and_then(|h| match h {
            Header::CallId(v) => Some(v.as_str()),
            _ => None,
        })
    }

    pub fn cseq(&self) -> Option<&CSeq> {
        self.headers.get("cseq").and_then(|h| match h {
            Header::CSeq(c) => Some(c),
            _ => None,
        })
    }

    pub fn top_via(&self) -> Option<&Via> {
        self.headers.get("via").and_then(|h| match h {
            Header::Via(v) => Some(v),
            _ => None,
        })
    }

    pub fn all_vias(&self) -> Vec<&Via> {
        self.headers
            .get_all("via")
            .filter_map(|h| match h {
                Header::Via(v) => Some(v),
                _ => None,
            })
            .collect()
    }

    pub fn contact(&self) -> Option<&Contact> {
        self.headers.get("contact").and_then(as_named)
    }

    pub fn set_header(&mut self, name: &str, header: Header) {
        self.headers.set(name, header);
    }

    pub fn set_body(&mut self, body: Vec<u8>, content_type: Option<ContentType>) {
        let len = body.len() as u32;
        self.body = body;
        self.headers.set("content-length", Header::ContentLength(len));
        if let Some(ct) = content_type {
            self.headers.set("content-type", Header::ContentType(ct));
        }
    }
}

const CANON_FROM_COMPACT: &str = "from";

fn as_named(h: &Header) -> Option<&From> {
    match h {
        Header::From(v) | Header::To(v) | Header::Contact(v) | Header::Route(v) | Header::RecordRoute(v) => Some(v),
        _ => None,
    }
}

impl Message {
    pub fn is_request(&self) -> bool {
        matches!(self, Message::Request(_))
    }

    pub fn headers(&self) -> &HeaderMap {
        match self {
            Message::Request(r) => &r.headers,
            Message::Response(r) => &r.headers,
        }
    }

    pub fn call_id(&self) -> Option<&str> {
        match self {
            Message::Request(r) => r.call_id(),
            Message::Response(r) => r.call_id(),
        }
    }

    pub fn cseq(&self) -> Option<&CSeq> {
        match self {
            Message::Request(r) => r.cseq(),
            Message::Response(r) => r.cseq(),
        }
    }
}

/// Builds a response that correlates with `request` per RFC 3261 §8.2.6:
/// copies the Via list, To, From, Call-ID, CSeq. `to_tag` is applied when
/// the response is dialog-establishing (1xx-with-tag or any 2xx).
pub fn reply(request: &Request, status: StatusCode, to_tag: Option<&str>) -> Response {
    let mut response = Response::new(status);
    for via in request.all_vias() {
        response.headers.push(Header::Via(via.clone()));
    }
    if let Some(Header::From(from)) = request.headers.get("from") {
        response.headers.push(Header::From(from.clone()));
    }
    if let Some(Header::To(to)) = request.headers.get("to") {
        let to = match to_tag {
            Some(tag) if to.tag().is_none() => to.clone().with_tag(tag),
            _ => to.clone(),
        };
        response.headers.push(Header::To(to));
    }
    if let Some(call_id) = request.call_id() {
        response.headers.push(Header::CallId(call_id.to_string()));
    }
    if let Some(cseq) = request.cseq() {
        response.headers.push(Header::CSeq(cseq.clone()));
    }
    response.headers.set("content-length", Header::ContentLength(0));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::Header;
    use crate::headers::NamedAddress;
    use crate::uri::Uri;

    fn sample_request() -> Request {
        let mut headers = HeaderMap::new();
        headers.push(Header::Via(Via::new(
            "UDP",
            crate::uri::Host::Hostname("pc33.atlanta.com".into()),
            Some(5060),
            vec![crate::param::Param::branch("z9hG4bK776asdhds")],
        )));
        headers.push(Header::From(
            NamedAddress::new(Some("Alice".into()), Uri::sip("atlanta.com").with_user("alice")).with_tag("1928301774"),
        ));
        headers.push(Header::To(NamedAddress::new(
            Some("Bob".into()),
            Uri::sip("biloxi.com").with_user("bob"),
        )));
        headers.push(Header::CallId("a84b4c76e66710@pc33.atlanta.com".into()));
        headers.push(Header::CSeq(CSeq { seq: 314159, method: Method::Invite }));
        Request::new(Method::Invite, Uri::sip("biloxi.com").with_user("bob"), headers)
    }

    #[test]
    fn reply_correlates_with_request() {
        let request = sample_request();
        let response = reply(&request, StatusCode::OK, Some("a6c85cf"));
        assert_eq!(response.call_id(), request.call_id());
        assert_eq!(response.cseq(), request.cseq());
        assert_eq!(response.from_header().unwrap().tag(), request.from_header().unwrap().tag());
        assert_eq!(response.to_header().unwrap().uri, request.to_header().unwrap().uri);
        assert_eq!(response.all_vias().len(), request.all_vias().len());
        assert_eq!(response.to_header().unwrap().tag(), Some("a6c85cf"));
    }

    #[test]
    fn reply_does_not_overwrite_existing_to_tag() {
        let mut request = sample_request();
        if let Header::To(to) = request.headers.get("to").unwrap().clone() {
            request.headers.set("to", Header::To(to.with_tag("already-set")));
        }
        let response = reply(&request, StatusCode::OK, Some("new-tag"));
        assert_eq!(response.to_header().unwrap().tag(), Some("already-set"));
    }
}
