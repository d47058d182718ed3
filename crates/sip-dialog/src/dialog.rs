//! The dialog entity, its state machine, and in-dialog request construction
//! (spec §4.E).

use sip_parse::branch::generate_branch;
use sip_types::dialog_id::DialogKey;
use sip_types::header::{Header, HeaderMap};
use sip_types::headers::{CSeq, NamedAddress};
use sip_types::message::{Request, Response};
use sip_types::method::Method;
use sip_types::uri::Uri;
use sip_types::via::Via;
use sip_transaction::TransactionKey;
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogState {
    /// Created from a 1xx-with-tag; no 2xx has arrived/been sent yet.
    Early,
    /// Created or promoted by a 2xx to the INVITE.
    Confirmed,
    /// A 2xx BYE went through, a non-2xx final arrived on an early dialog,
    /// or the owner declared the dialog dead.
    Terminated,
}

/// One RFC 3261 dialog: identity, route set, and the two independent
/// request-number sequences (spec §3 Dialog entity).
#[derive(Debug, Clone)]
pub struct Dialog {
    pub key: DialogKey,
    pub state: DialogState,
    pub local_uri: Uri,
    pub remote_uri: Uri,
    pub local_tag: String,
    pub remote_tag: String,
    /// The target URI in-dialog requests are sent to: the peer's Contact.
    pub remote_target: Uri,
    /// Record-Route list of the dialog-establishing exchange, reversed
    /// (RFC 3261 §12.1.1/§12.1.2).
    pub route_set: Vec<Uri>,
    pub local_seq: u32,
    pub remote_seq: Option<u32>,
    /// The INVITE transaction that created this dialog, kept so the façade
    /// can correlate a CANCEL/ACK path back to it.
    pub invite_transaction: Option<TransactionKey>,
}

/// RFC 3261 §12.1: a response establishes a dialog when it is a 1xx
/// carrying a To-tag, or any 2xx, to an INVITE.
pub fn is_dialog_establishing(response: &Response) -> bool {
    let has_to_tag = response.to_header().and_then(|t| t.tag()).is_some();
    (response.status.is_provisional() && has_to_tag) || response.status.is_success()
}

/// Record-Route list taken in order, reversed (RFC 3261 §12.1.1/§12.1.2).
/// Whether this is read from the request (UAS) or the response (UAC)
/// depends on which side is constructing the dialog.
pub fn extract_route_set(headers: &HeaderMap) -> Vec<Uri> {
    let mut routes: Vec<Uri> = headers
        .get_all("record-route")
        .filter_map(|h| match h {
            Header::RecordRoute(addr) => Some(addr.uri.clone()),
            _ => None,
        })
        .collect();
    routes.reverse();
    routes
}

impl Dialog {
    /// UAC side: called when a dialog-establishing response to our own
    /// INVITE arrives. Local = our From-tag, remote = their To-tag
    /// (spec §4.E).
    pub fn from_uac_response(invite: &Request, response: &Response, invite_transaction: Option<TransactionKey>) -> Result<Dialog> {
        if !is_dialog_establishing(response) {
            return Err(Error::NotDialogEstablishing);
        }
        let call_id = invite.call_id().ok_or(Error::MissingHeader("Call-ID"))?.to_string();
        let local_tag = invite.from_header().and_then(|f| f.tag()).ok_or(Error::MissingHeader("From;tag"))?.to_string();
        let remote_tag = response.to_header().and_then(|t| t.tag()).ok_or(Error::MissingHeader("To;tag"))?.to_string();
        let local_uri = invite.from_header().ok_or(Error::MissingHeader("From"))?.uri.clone();
        let remote_uri = response.to_header().ok_or(Error::MissingHeader("To"))?.uri.clone();
        let remote_target = response.contact().ok_or(Error::MissingHeader("Contact"))?.uri.clone();
        let state = if response.status.is_success() { DialogState::Confirmed } else { DialogState::Early };
        let local_seq = invite.cseq().ok_or(Error::MissingHeader("CSeq"))?.seq;
        let key = DialogKey::new(call_id, local_tag.clone(), remote_tag.clone());
        debug!(%key, ?state, "dialog created (UAC)");
        Ok(Dialog {
            key,
            state,
            local_uri,
            remote_uri,
            local_tag,
            remote_tag,
            remote_target,
            route_set: extract_route_set(&response.headers),
            local_seq,
            remote_seq: None,
            invite_transaction,
        })
    }

    /// UAS side: called when we transmit a dialog-establishing response to
    /// an incoming INVITE. Local = our own To-tag, remote = the caller's
    /// From-tag (spec §4.E).
    pub fn from_uas_response(invite: &Request, response: &Response, invite_transaction: Option<TransactionKey>) -> Result<Dialog> {
        if !is_dialog_establishing(response) {
            return Err(Error::NotDialogEstablishing);
        }
        let call_id = invite.call_id().ok_or(Error::MissingHeader("Call-ID"))?.to_string();
        let local_tag = response.to_header().and_then(|t| t.tag()).ok_or(Error::MissingHeader("To;tag"))?.to_string();
        let remote_tag = invite.from_header().and_then(|f| f.tag()).ok_or(Error::MissingHeader("From;tag"))?.to_string();
        let local_uri = response.to_header().ok_or(Error::MissingHeader("To"))?.uri.clone();
        let remote_uri = invite.from_header().ok_or(Error::MissingHeader("From"))?.uri.clone();
        let remote_target = invite.contact().ok_or(Error::MissingHeader("Contact"))?.uri.clone();
        let state = if response.status.is_success() { DialogState::Confirmed } else { DialogState::Early };
        let remote_seq = invite.cseq().ok_or(Error::MissingHeader("CSeq"))?.seq;
        let key = DialogKey::new(call_id, local_tag.clone(), remote_tag.clone());
        debug!(%key, ?state, "dialog created (UAS)");
        Ok(Dialog {
            key,
            state,
            local_uri,
            remote_uri,
            local_tag,
            remote_tag,
            remote_target,
            route_set: extract_route_set(&invite.headers),
            local_seq: 0,
            remote_seq: Some(remote_seq),
            invite_transaction,
        })
    }

    /// A 2xx arriving on an early dialog promotes it (spec §4.E "confirmed
    /// (from 2xx to INVITE)").
    pub fn confirm(&mut self) {
        if self.state == DialogState::Early {
            self.state = DialogState::Confirmed;
        }
    }

    /// A non-2xx final response on an early dialog (or the owner declaring
    /// the call dead) terminates it.
    pub fn terminate(&mut self) {
        self.state = DialogState::Terminated;
    }

    /// In-dialog request construction (spec §4.E): increments `local_seq`,
    /// applies the route set, and stamps a freshly generated branch onto
    /// the caller-supplied Via template (the dialog owns branch generation,
    /// not the Via's transport-specific host/port).
    pub fn build_request(&mut self, method: Method, mut via: Via, max_forwards: u8) -> Request {
        self.local_seq += 1;
        via.set_branch(generate_branch());
        let mut headers = HeaderMap::new();
        headers.push(Header::Via(via));
        for route in &self.route_set {
            headers.push(Header::Route(NamedAddress::new(None, route.clone())));
        }
        headers.push(Header::From(NamedAddress::new(None, self.local_uri.clone()).with_tag(self.local_tag.clone())));
        headers.push(Header::To(NamedAddress::new(None, self.remote_uri.clone()).with_tag(self.remote_tag.clone())));
        headers.push(Header::CallId(self.key.call_id.clone()));
        headers.push(Header::CSeq(CSeq { seq: self.local_seq, method: method.clone() }));
        headers.push(Header::MaxForwards(max_forwards));
        Request::new(method, self.remote_target.clone(), headers)
    }

    /// ACK for the 2xx to our own INVITE: RFC 3261 §13.2.2.4 — a separate
    /// transaction, but still uses the INVITE's CSeq number, not a fresh
    /// one (spec §4.E).
    pub fn build_ack(&self, invite_seq: u32, mut via: Via) -> Request {
        via.set_branch(generate_branch());
        let mut headers = HeaderMap::new();
        headers.push(Header::Via(via));
        for route in &self.route_set {
            headers.push(Header::Route(NamedAddress::new(None, route.clone())));
        }
        headers.push(Header::From(NamedAddress::new(None, self.local_uri.clone()).with_tag(self.local_tag.clone())));
        headers.push(Header::To(NamedAddress::new(None, self.remote_uri.clone()).with_tag(self.remote_tag.clone())));
        headers.push(Header::CallId(self.key.call_id.clone()));
        headers.push(Header::CSeq(CSeq { seq: invite_seq, method: Method::Ack }));
        Request::new(Method::Ack, self.remote_target.clone(), headers)
    }

    /// In-dialog request processing (spec §4.E): rejects out-of-order
    /// requests per RFC 3261 §12.2.2, and moves a dialog to `Terminated` on
    /// any BYE regardless of current state.
    pub fn process_incoming_request(&mut self, request: &Request) -> Result<()> {
        let seq = request.cseq().ok_or(Error::MissingHeader("CSeq"))?.seq;
        if let Some(prev) = self.remote_seq {
            if seq <= prev {
                return Err(Error::OutOfOrderRequest { expected: prev, got: seq });
            }
        }
        self.remote_seq = Some(seq);
        if request.method == Method::Bye {
            self.terminate();
        }
        Ok(())
    }
}

/// Spec §4.E "Dialog match for incoming requests": lookup by
/// `(call-id, to-tag-of-request-as-local, from-tag-of-request-as-remote)`.
/// This holds regardless of whether we originally played UAC or UAS, since
/// an incoming request's To-tag always names us.
pub fn key_for_incoming_request(request: &Request) -> Option<DialogKey> {
    let call_id = request.call_id()?.to_string();
    let local_tag = request.to_header()?.tag()?.to_string();
    let remote_tag = request.from_header()?.tag()?.to_string();
    Some(DialogKey::new(call_id, local_tag, remote_tag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sip_types::header::Header;
    use sip_types::headers::NamedAddress;
    use sip_types::message::reply;
    use sip_types::param::Param;
    use sip_types::status::StatusCode;
    use sip_types::uri::Host;

    fn sample_invite() -> Request {
        let mut headers = HeaderMap::new();
        headers.push(Header::Via(Via::new("UDP", Host::Hostname("pc33.atlanta.com".into()), Some(5060), vec![Param::branch("z9hG4bK776asdhds")])));
        headers.push(Header::From(NamedAddress::new(Some("Alice".into()), Uri::sip("atlanta.com").with_user("alice")).with_tag("1928301774")));
        headers.push(Header::To(NamedAddress::new(Some("Bob".into()), Uri::sip("biloxi.com").with_user("bob"))));
        headers.push(Header::CallId("a84b4c76e66710@pc33.atlanta.com".into()));
        headers.push(Header::CSeq(CSeq { seq: 314159, method: Method::Invite }));
        headers.push(Header::Contact(NamedAddress::new(None, Uri::sip("pc33.atlanta.com").with_user("alice"))));
        Request::new(Method::Invite, Uri::sip("biloxi.com").with_user("bob"), headers)
    }

    fn via_template() -> Via {
        Via::new("UDP", Host::Hostname("pc33.atlanta.com".into()), Some(5060), vec![])
    }

    #[test]
    fn uac_dialog_early_on_1xx_with_tag() {
        let invite = sample_invite();
        let mut ringing = reply(&invite, StatusCode::RINGING, Some("314159"));
        ringing.headers.push(Header::Contact(NamedAddress::new(None, Uri::sip("biloxi.com").with_user("bob"))));
        let dialog = Dialog::from_uac_response(&invite, &ringing, None).unwrap();
        assert_eq!(dialog.state, DialogState::Early);
        assert_eq!(dialog.local_tag, "1928301774");
        assert_eq!(dialog.remote_tag, "314159");
    }

    #[test]
    fn uac_dialog_confirmed_on_2xx() {
        let invite = sample_invite();
        let mut ok = reply(&invite, StatusCode::OK, Some("314159"));
        ok.headers.push(Header::Contact(NamedAddress::new(None, Uri::sip("biloxi.com").with_user("bob"))));
        let dialog = Dialog::from_uac_response(&invite, &ok, None).unwrap();
        assert_eq!(dialog.state, DialogState::Confirmed);
    }

    #[test]
    fn non_dialog_establishing_response_is_rejected() {
        let invite = sample_invite();
        let trying = reply(&invite, StatusCode::TRYING, None);
        assert_eq!(Dialog::from_uac_response(&invite, &trying, None).unwrap_err(), Error::NotDialogEstablishing);
    }

    #[test]
    fn route_set_is_record_route_reversed() {
        let mut headers = HeaderMap::new();
        headers.push(Header::RecordRoute(NamedAddress::new(None, Uri::sip("proxy1.com"))));
        headers.push(Header::RecordRoute(NamedAddress::new(None, Uri::sip("proxy2.com"))));
        let route_set = extract_route_set(&headers);
        assert_eq!(route_set, vec![Uri::sip("proxy2.com"), Uri::sip("proxy1.com")]);
    }

    #[test]
    fn build_request_increments_local_seq_and_applies_route_set() {
        let invite = sample_invite();
        let mut ok = reply(&invite, StatusCode::OK, Some("314159"));
        ok.headers.push(Header::Contact(NamedAddress::new(None, Uri::sip("biloxi.com").with_user("bob"))));
        ok.headers.push(Header::RecordRoute(NamedAddress::new(None, Uri::sip("proxy.atlanta.com"))));
        let mut dialog = Dialog::from_uac_response(&invite, &ok, None).unwrap();
        assert_eq!(dialog.local_seq, 314159);

        let bye = dialog.build_request(Method::Bye, via_template(), 70);
        assert_eq!(dialog.local_seq, 314160);
        assert_eq!(bye.cseq().unwrap().seq, 314160);
        assert_eq!(bye.headers.get_all("route").count(), 1);
        assert_eq!(bye.from_header().unwrap().tag(), Some("1928301774"));
        assert_eq!(bye.to_header().unwrap().tag(), Some("314159"));
    }

    #[test]
    fn ack_reuses_invite_cseq_number() {
        let invite = sample_invite();
        let mut ok = reply(&invite, StatusCode::OK, Some("314159"));
        ok.headers.push(Header::Contact(NamedAddress::new(None, Uri::sip("biloxi.com").with_user("bob"))));
        let dialog = Dialog::from_uac_response(&invite, &ok, None).unwrap();
        let ack = dialog.build_ack(314159, via_template());
        assert_eq!(ack.cseq().unwrap().seq, 314159);
        assert_eq!(ack.method, Method::Ack);
    }

    #[test]
    fn out_of_order_in_dialog_request_is_rejected() {
        let invite = sample_invite();
        let mut ok = reply(&invite, StatusCode::OK, Some("314159"));
        ok.headers.push(Header::Contact(NamedAddress::new(None, Uri::sip("biloxi.com").with_user("bob"))));
        let mut dialog = Dialog::from_uas_response(&invite, &ok, None).unwrap();
        assert_eq!(dialog.remote_seq, Some(314159));

        let mut stale_headers = HeaderMap::new();
        stale_headers.push(Header::CSeq(CSeq { seq: 314159, method: Method::Info }));
        let stale = Request::new(Method::Info, Uri::sip("pc33.atlanta.com"), stale_headers);
        assert!(dialog.process_incoming_request(&stale).is_err());
    }

    #[test]
    fn bye_terminates_dialog_from_any_state() {
        let invite = sample_invite();
        let mut ringing = reply(&invite, StatusCode::RINGING, Some("314159"));
        ringing.headers.push(Header::Contact(NamedAddress::new(None, Uri::sip("biloxi.com").with_user("bob"))));
        let mut dialog = Dialog::from_uac_response(&invite, &ringing, None).unwrap();

        let mut bye_headers = HeaderMap::new();
        bye_headers.push(Header::CSeq(CSeq { seq: 1, method: Method::Bye }));
        let bye = Request::new(Method::Bye, Uri::sip("pc33.atlanta.com"), bye_headers);
        dialog.process_incoming_request(&bye).unwrap();
        assert_eq!(dialog.state, DialogState::Terminated);
    }

    #[test]
    fn incoming_request_key_swaps_to_and_from_tags() {
        let mut headers = HeaderMap::new();
        headers.push(Header::From(NamedAddress::new(None, Uri::sip("a.com")).with_tag("remote-tag")));
        headers.push(Header::To(NamedAddress::new(None, Uri::sip("b.com")).with_tag("local-tag")));
        headers.push(Header::CallId("call-1".into()));
        let request = Request::new(Method::Bye, Uri::sip("b.com"), headers);
        let key = key_for_incoming_request(&request).unwrap();
        assert_eq!(key, DialogKey::new("call-1", "local-tag", "remote-tag"));
    }
}
