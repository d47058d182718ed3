//! Datagram <-> `Message` codec (spec §4.B Parse/Serialize).

use sip_types::header::{self, Header, HeaderMap};
use sip_types::message::{Direction, Message, Request, Response};
use sip_types::method::Method;
use sip_types::status::StatusCode;

use crate::error::{Error, Result};
use crate::headers;
use crate::uri::parse_uri;
use crate::via::{parse_via_list, split_unquoted_commas};

/// Default MTU guard for outbound UDP datagrams (spec §4.C).
pub const DEFAULT_MTU_GUARD: usize = 1300;

fn unfold_headers(section: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in section.split("\r\n") {
        if raw.is_empty() {
            continue;
        }
        if (raw.starts_with(' ') || raw.starts_with('\t')) && !lines.is_empty() {
            let last = lines.last_mut().unwrap();
            last.push(' ');
            last.push_str(raw.trim_start());
        } else {
            lines.push(raw.to_string());
        }
    }
    lines
}

enum StartLine {
    Request { method: Method, uri: String, version: String },
    Status { version: String, status: u16, reason: String },
}

fn parse_start_line(line: &str) -> Result<StartLine> {
    let parts: Vec<&str> = line.splitn(3, ' ').collect();
    if parts.len() != 3 {
        return Err(Error::MissingStartLine);
    }
    if parts[0].starts_with("SIP/") {
        let status: u16 = parts[1].parse().map_err(|_| Error::BadStatus(line.to_string()))?;
        Ok(StartLine::Status { version: parts[0].to_string(), status, reason: parts[2].to_string() })
    } else {
        let method: Method = parts[0].parse().map_err(|_| Error::BadMethod(parts[0].to_string()))?;
        Ok(StartLine::Request { method, uri: parts[1].to_string(), version: parts[2].to_string() })
    }
}

fn apply_header_line(map: &mut HeaderMap, name: &str, value: &str) -> Result<()> {
    let canon = header::expand_compact(name);
    match canon.as_str() {
        header::CANON_VIA => {
            for via in parse_via_list(value)? {
                map.push(Header::Via(via));
            }
        }
        header::CANON_FROM => map.push(Header::From(headers::parse_named_address(value)?)),
        header::CANON_TO => map.push(Header::To(headers::parse_named_address(value)?)),
        header::CANON_CONTACT => {
            if value.trim() == "*" {
                map.push(Header::Generic(header::CANON_CONTACT.into(), "*".into()));
            } else {
                for segment in split_unquoted_commas(value) {
                    map.push(Header::Contact(headers::parse_named_address(segment)?));
                }
            }
        }
        header::CANON_ROUTE => {
            for segment in split_unquoted_commas(value) {
                map.push(Header::Route(headers::parse_named_address(segment)?));
            }
        }
        header::CANON_RECORD_ROUTE => {
            for segment in split_unquoted_commas(value) {
                map.push(Header::RecordRoute(headers::parse_named_address(segment)?));
            }
        }
        header::CANON_CSEQ => map.push(Header::CSeq(headers::parse_cseq(value)?)),
        header::CANON_CALL_ID => map.push(Header::CallId(value.trim().to_string())),
        header::CANON_CONTENT_LENGTH => map.push(Header::ContentLength(headers::parse_content_length(value)?)),
        header::CANON_CONTENT_TYPE => map.push(Header::ContentType(headers::parse_content_type(value)?)),
        header::CANON_MAX_FORWARDS => map.push(Header::MaxForwards(headers::parse_max_forwards(value)?)),
        header::CANON_EVENT => map.push(Header::Event(value.trim().to_string())),
        header::CANON_EXPIRES => map.push(Header::Expires(headers::parse_expires(value)?)),
        header::CANON_SUBJECT => map.push(Header::Subject(value.trim().to_string())),
        header::CANON_SUBSCRIPTION_STATE => map.push(Header::SubscriptionState(value.trim().to_string())),
        header::CANON_SUPPORTED => map.push(Header::Supported(value.trim().to_string())),
        other => map.push(Header::Generic(other.to_string(), value.trim().to_string())),
    }
    Ok(())
}

fn parse_headers(lines: &[String]) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for line in lines {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| Error::BadHeader { name: "?".into(), value: line.clone() })?;
        apply_header_line(&mut map, name.trim(), value.trim())?;
    }
    Ok(map)
}

fn require_call_id(map: &HeaderMap) -> Result<()> {
    if map.get(header::CANON_CALL_ID).is_none() {
        return Err(Error::MissingRequiredHeader("Call-ID"));
    }
    Ok(())
}

fn require_from_to_cseq(map: &HeaderMap) -> Result<()> {
    if map.get(header::CANON_FROM).is_none() {
        return Err(Error::MissingRequiredHeader("From"));
    }
    if map.get(header::CANON_TO).is_none() {
        return Err(Error::MissingRequiredHeader("To"));
    }
    if map.get(header::CANON_CSEQ).is_none() {
        return Err(Error::MissingRequiredHeader("CSeq"));
    }
    Ok(())
}

/// Parses one UDP datagram into a [`Message`] (spec §4.B Parse). On any
/// failure a taxonomy error is returned and nothing is partially built.
pub fn parse_datagram(bytes: &[u8]) -> Result<Message> {
    let split_at = find_header_body_split(bytes).ok_or(Error::MissingStartLine)?;
    let (header_bytes, body) = bytes.split_at(split_at);
    let header_section =
        std::str::from_utf8(header_bytes).map_err(|_| Error::BadHeader { name: "?".into(), value: "non-utf8".into() })?;

    let mut lines = unfold_headers(header_section);
    if lines.is_empty() {
        return Err(Error::MissingStartLine);
    }
    let start_line = lines.remove(0);
    let start = parse_start_line(&start_line)?;
    let headers = parse_headers(&lines)?;

    if let Some(Header::ContentLength(declared)) = headers.get(header::CANON_CONTENT_LENGTH) {
        if *declared as usize != body.len() {
            return Err(Error::ContentLengthMismatch { declared: *declared as usize, actual: body.len() });
        }
    }

    require_call_id(&headers)?;
    require_from_to_cseq(&headers)?;

    match start {
        StartLine::Request { method, uri, version } => {
            if headers.get(header::CANON_VIA).is_none() {
                return Err(Error::MissingRequiredHeader("Via"));
            }
            let uri = parse_uri(&uri)?;
            let mut request = Request::new(method, uri, headers);
            request.version = version;
            request.body = body.to_vec();
            request.direction = Direction::Incoming;
            Ok(Message::Request(request))
        }
        StartLine::Status { version, status, reason } => {
            let status = StatusCode::new(status).map_err(|_| Error::BadStatus(status.to_string()))?;
            let mut response = Response::new(status);
            response.reason = reason;
            response.version = version;
            response.headers = headers;
            response.body = body.to_vec();
            response.direction = Direction::Incoming;
            Ok(Message::Response(response))
        }
    }
}

fn find_header_body_split(bytes: &[u8]) -> Option<usize> {
    bytes.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

fn emit_line(out: &mut Vec<u8>, canon: &str, value: impl std::fmt::Display) {
    out.extend_from_slice(header::display_form(canon).as_bytes());
    out.extend_from_slice(b": ");
    out.extend_from_slice(value.to_string().as_bytes());
    out.extend_from_slice(b"\r\n");
}

fn emit_group(out: &mut Vec<u8>, canon: &str, headers: &HeaderMap) {
    let values: Vec<String> = headers.get_all(canon).map(|h| h.to_string()).collect();
    if !values.is_empty() {
        emit_line(out, canon, values.join(", "));
    }
}

/// Serializes a [`Message`] into CRLF-terminated wire bytes (spec §4.B
/// Serialize), in the header order fixed by spec §3.
pub fn serialize(message: &Message) -> Vec<u8> {
    let mut out = Vec::new();
    let body: &[u8] = match message {
        Message::Request(r) => {
            out.extend_from_slice(format!("{} {} {}\r\n", r.method, r.uri, r.version).as_bytes());
            &r.body
        }
        Message::Response(r) => {
            out.extend_from_slice(format!("{} {} {}\r\n", r.version, r.status, r.reason).as_bytes());
            &r.body
        }
    };
    let headers = message.headers();

    emit_group(&mut out, header::CANON_VIA, headers);
    emit_group(&mut out, header::CANON_ROUTE, headers);
    emit_group(&mut out, header::CANON_RECORD_ROUTE, headers);
    if let Some(h) = headers.get(header::CANON_MAX_FORWARDS) {
        emit_line(&mut out, header::CANON_MAX_FORWARDS, h);
    }
    if let Some(h) = headers.get(header::CANON_FROM) {
        emit_line(&mut out, header::CANON_FROM, h);
    }
    if let Some(h) = headers.get(header::CANON_TO) {
        emit_line(&mut out, header::CANON_TO, h);
    }
    if let Some(h) = headers.get(header::CANON_CALL_ID) {
        emit_line(&mut out, header::CANON_CALL_ID, h);
    }
    if let Some(h) = headers.get(header::CANON_CSEQ) {
        emit_line(&mut out, header::CANON_CSEQ, h);
    }
    emit_group(&mut out, header::CANON_CONTACT, headers);

    let emitted = [
        header::CANON_VIA,
        header::CANON_ROUTE,
        header::CANON_RECORD_ROUTE,
        header::CANON_MAX_FORWARDS,
        header::CANON_FROM,
        header::CANON_TO,
        header::CANON_CALL_ID,
        header::CANON_CSEQ,
        header::CANON_CONTACT,
        header::CANON_CONTENT_LENGTH,
    ];
    for h in headers.iter() {
        let canon = h.canonical_name();
        if emitted.contains(&canon.as_str()) {
            continue;
        }
        emit_line(&mut out, &canon, h);
    }
    emit_line(&mut out, header::CANON_CONTENT_LENGTH, body.len());

    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(body);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use sip_types::header::Header;
    use sip_types::headers::{CSeq, NamedAddress};
    use sip_types::param::Param;
    use sip_types::uri::{Host, Uri};
    use sip_types::via::Via;

    fn sample_invite() -> Message {
        let mut headers = HeaderMap::new();
        headers.push(Header::Via(Via::new(
            "UDP",
            Host::Hostname("pc33.atlanta.com".into()),
            Some(5060),
            vec![Param::branch("z9hG4bK776asdhds")],
        )));
        headers.push(Header::MaxForwards(70));
        headers.push(Header::From(
            NamedAddress::new(Some("Alice".into()), Uri::sip("atlanta.com").with_user("alice")).with_tag("1928301774"),
        ));
        headers.push(Header::To(NamedAddress::new(Some("Bob".into()), Uri::sip("biloxi.com").with_user("bob"))));
        headers.push(Header::CallId("a84b4c76e66710@pc33.atlanta.com".into()));
        headers.push(Header::CSeq(CSeq { seq: 314159, method: Method::Invite }));
        let mut request = Request::new(Method::Invite, Uri::sip("biloxi.com").with_user("bob"), headers);
        request.body = b"v=0\r\n".to_vec();
        request.headers.push(Header::ContentLength(5));
        Message::Request(request)
    }

    #[test]
    fn parse_after_serialize_round_trips() {
        let message = sample_invite();
        let wire = serialize(&message);
        let parsed = parse_datagram(&wire).unwrap();
        assert_eq!(parsed.call_id(), message.call_id());
        assert_eq!(parsed.cseq(), message.cseq());
        if let Message::Request(r) = &parsed {
            assert_eq!(r.method, Method::Invite);
            assert_eq!(r.body, b"v=0\r\n");
            assert!(r.top_via().unwrap().is_rfc3261_compliant());
        } else {
            panic!("expected request");
        }
    }

    #[test]
    fn missing_via_on_request_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.push(Header::From(NamedAddress::new(None, Uri::sip("a.com"))));
        headers.push(Header::To(NamedAddress::new(None, Uri::sip("b.com"))));
        headers.push(Header::CallId("call-1".into()));
        headers.push(Header::CSeq(CSeq { seq: 1, method: Method::Invite }));
        let request = Request::new(Method::Invite, Uri::sip("b.com"), headers);
        let wire = serialize(&Message::Request(request));
        assert!(matches!(parse_datagram(&wire), Err(Error::MissingRequiredHeader("Via"))));
    }

    #[test]
    fn content_length_mismatch_is_rejected() {
        let raw = b"INVITE sip:bob@biloxi.com SIP/2.0\r\nVia: SIP/2.0/UDP pc33.atlanta.com;branch=z9hG4bK1\r\nFrom: <sip:alice@a.com>;tag=1\r\nTo: <sip:bob@b.com>\r\nCall-ID: call-1\r\nCSeq: 1 INVITE\r\nContent-Length: 10\r\n\r\nshort";
        assert!(matches!(parse_datagram(raw), Err(Error::ContentLengthMismatch { .. })));
    }
}
