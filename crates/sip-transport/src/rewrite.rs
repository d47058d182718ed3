//! Inbound Via rewriting (spec §4.C rules 1-2, RFC 3581).

use std::net::SocketAddr;

use sip_types::header::Header;
use sip_types::message::Request;

/// Rule 1 (always): append `received=<remote-ip>` to the top Via.
/// Rule 2 (RFC 3581): if the top Via carries a valueless `rport`, fill it
/// in with the port the datagram actually arrived from.
pub fn rewrite_top_via(request: &mut Request, remote: SocketAddr) {
    let wants_rport = request.top_via().map(|v| v.has_rport_flag()).unwrap_or(false);
    let Some(Header::Via(mut top)) = request.headers.get("via").cloned() else {
        return;
    };
    top.set_received(remote.ip());
    if wants_rport {
        top.set_rport(remote.port());
    }

    // Via is stored as repeated entries in arrival order; replace only the
    // first (top-of-stack) one, keeping the rest untouched.
    let rest: Vec<Header> = request
        .headers
        .get_all("via")
        .skip(1)
        .cloned()
        .collect();
    request.headers.remove("via");
    request.headers.push(Header::Via(top));
    for h in rest {
        request.headers.push(h);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sip_types::header::HeaderMap;
    use sip_types::method::Method;
    use sip_types::param::Param;
    use sip_types::uri::{Host, Uri};
    use sip_types::via::Via;

    fn request_with_via(params: Vec<Param>) -> Request {
        let mut headers = HeaderMap::new();
        headers.push(Header::Via(Via::new("UDP", Host::Hostname("pc33.atlanta.com".into()), Some(5060), params)));
        Request::new(Method::Invite, Uri::sip("biloxi.com"), headers)
    }

    #[test]
    fn always_appends_received() {
        let mut request = request_with_via(vec![Param::branch("z9hG4bK1")]);
        rewrite_top_via(&mut request, "203.0.113.1:9001".parse().unwrap());
        assert_eq!(request.top_via().unwrap().received(), Some("203.0.113.1"));
    }

    #[test]
    fn fills_rport_only_when_flag_present() {
        let mut with_flag = request_with_via(vec![Param::branch("z9hG4bK1"), Param::flag("rport")]);
        rewrite_top_via(&mut with_flag, "203.0.113.1:9001".parse().unwrap());
        assert_eq!(
            sip_types::param::find_value(&with_flag.top_via().unwrap().params, "rport"),
            Some("9001")
        );

        let mut without_flag = request_with_via(vec![Param::branch("z9hG4bK1")]);
        rewrite_top_via(&mut without_flag, "203.0.113.1:9001".parse().unwrap());
        assert!(sip_types::param::find_value(&without_flag.top_via().unwrap().params, "rport").is_none());
    }
}
