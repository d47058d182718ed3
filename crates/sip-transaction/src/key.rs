//! Transaction matching key (spec §4.D §17.2.3: `(branch, sent-by-host,
//! sent-by-port, CSeq-method)`).

use sip_types::message::{Request, Response};
use sip_types::method::Method;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionKey {
    pub branch: String,
    pub sent_by_host: String,
    pub sent_by_port: u16,
    /// Normalized so an ACK to a non-2xx final matches its INVITE
    /// transaction: ACK is folded to INVITE for this field only.
    pub method: Method,
}

fn fold_ack_to_invite(method: &Method) -> Method {
    if *method == Method::Ack {
        Method::Invite
    } else {
        method.clone()
    }
}

impl TransactionKey {
    pub fn for_request(request: &Request) -> Option<TransactionKey> {
        let via = request.top_via()?;
        let branch = via.branch()?.to_string();
        let (host, port) = via.sent_by();
        Some(TransactionKey { branch, sent_by_host: host, sent_by_port: port, method: fold_ack_to_invite(&request.method) })
    }

    /// A response matches the transaction whose key was built from its own
    /// top Via and the CSeq method it carries.
    pub fn for_response(response: &Response) -> Option<TransactionKey> {
        let via = response.top_via()?;
        let branch = via.branch()?.to_string();
        let (host, port) = via.sent_by();
        let method = response.cseq()?.method.clone();
        Some(TransactionKey { branch, sent_by_host: host, sent_by_port: port, method: fold_ack_to_invite(&method) })
    }

    /// RFC 3261 §9.1: a CANCEL carries the same branch and sent-by as the
    /// request it cancels, but its own CSeq method is CANCEL — so the key
    /// of the INVITE server transaction it targets is this, not
    /// `for_request(cancel)`.
    pub fn for_cancel(cancel: &Request) -> Option<TransactionKey> {
        let via = cancel.top_via()?;
        let branch = via.branch()?.to_string();
        let (host, port) = via.sent_by();
        Some(TransactionKey { branch, sent_by_host: host, sent_by_port: port, method: Method::Invite })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sip_types::header::{Header, HeaderMap};
    use sip_types::headers::CSeq;
    use sip_types::param::Param;
    use sip_types::uri::{Host, Uri};
    use sip_types::via::Via;

    fn via(branch: &str) -> Via {
        Via::new("UDP", Host::Hostname("pc33.atlanta.com".into()), Some(5060), vec![Param::branch(branch)])
    }

    #[test]
    fn ack_to_non_2xx_folds_to_invite_for_matching() {
        let mut headers = HeaderMap::new();
        headers.push(Header::Via(via("z9hG4bK1")));
        headers.push(Header::CSeq(CSeq { seq: 1, method: Method::Ack }));
        let ack = Request::new(Method::Ack, Uri::sip("biloxi.com"), headers);
        let key = TransactionKey::for_request(&ack).unwrap();
        assert_eq!(key.method, Method::Invite);
    }

    #[test]
    fn cancel_key_matches_the_invite_it_targets() {
        let mut invite_headers = HeaderMap::new();
        invite_headers.push(Header::Via(via("z9hG4bK1")));
        invite_headers.push(Header::CSeq(CSeq { seq: 1, method: Method::Invite }));
        let invite = Request::new(Method::Invite, Uri::sip("biloxi.com"), invite_headers);

        let mut cancel_headers = HeaderMap::new();
        cancel_headers.push(Header::Via(via("z9hG4bK1")));
        cancel_headers.push(Header::CSeq(CSeq { seq: 1, method: Method::Cancel }));
        let cancel = Request::new(Method::Cancel, Uri::sip("biloxi.com"), cancel_headers);

        assert_eq!(TransactionKey::for_request(&invite).unwrap(), TransactionKey::for_cancel(&cancel).unwrap());
        assert_ne!(TransactionKey::for_request(&cancel).unwrap(), TransactionKey::for_cancel(&cancel).unwrap());
    }

    #[test]
    fn request_and_response_keys_match_for_same_exchange() {
        let mut req_headers = HeaderMap::new();
        req_headers.push(Header::Via(via("z9hG4bK1")));
        req_headers.push(Header::CSeq(CSeq { seq: 1, method: Method::Invite }));
        let request = Request::new(Method::Invite, Uri::sip("biloxi.com"), req_headers);
        let response = sip_types::message::reply(&request, sip_types::status::StatusCode::OK, None);

        assert_eq!(TransactionKey::for_request(&request), TransactionKey::for_response(&response));
    }
}
