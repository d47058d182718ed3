//! The four RFC 3261 §17 state machines, unified behind one struct that
//! dispatches on `(role, kind)` (spec §4.D).
//!
//! A `Transaction` is a pure state machine: it never touches a socket or a
//! channel. Every method returns a `Vec<Effect>` describing what the caller
//! (`TransactionManager`) must do — send bytes, notify the owning TU, or
//! drop the transaction from the registry. This keeps the timer arithmetic
//! and state transitions unit-testable without a runtime or real I/O.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use sip_types::header::Header;
use sip_types::headers::CSeq;
use sip_types::message::{reply, Request, Response};
use sip_types::method::Method;
use sip_types::status::StatusCode;
use tracing::{debug, trace};

use crate::key::TransactionKey;
use crate::state::{Kind, Role, State};
use crate::timer::{self, TimerName};

#[derive(Debug, Clone)]
pub enum Effect {
    SendRequest(Request, SocketAddr),
    SendResponse(Response, SocketAddr),
    Notify(crate::event::TransactionEvent),
    Terminated(TransactionKey),
}

pub struct Transaction {
    pub key: TransactionKey,
    pub role: Role,
    pub kind: Kind,
    pub state: State,
    pub request: Request,
    destination: SocketAddr,
    last_provisional: Option<Response>,
    last_final: Option<Response>,
    cached_ack: Option<Request>,
    retransmit_interval: Duration,
    timers: HashMap<TimerName, Instant>,
}

impl Transaction {
    fn arm(&mut self, timer: TimerName, delay: Duration, now: Instant) {
        self.timers.insert(timer, now + delay);
    }

    fn disarm(&mut self, timer: TimerName) {
        self.timers.remove(&timer);
    }

    fn disarm_all(&mut self) {
        self.timers.clear();
    }

    /// Timers due at or before `now`, for the manager's sweep.
    pub fn due_timers(&self, now: Instant) -> Vec<TimerName> {
        self.timers.iter().filter(|(_, deadline)| **deadline <= now).map(|(name, _)| *name).collect()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.values().min().copied()
    }

    fn set_terminated(&mut self, now: Instant) -> Vec<Effect> {
        self.disarm_all();
        self.state = State::Terminated;
        debug!(key = ?self.key, "transaction terminated");
        let _ = now;
        vec![Effect::Notify(crate::event::TransactionEvent::Terminated(self.key.clone())), Effect::Terminated(self.key.clone())]
    }

    // ---- constructors ----

    pub fn new_client_invite(key: TransactionKey, request: Request, destination: SocketAddr, now: Instant) -> (Transaction, Vec<Effect>) {
        let mut txn = Transaction {
            key,
            role: Role::Client,
            kind: Kind::Invite,
            state: State::Calling,
            request: request.clone(),
            destination,
            last_provisional: None,
            last_final: None,
            cached_ack: None,
            retransmit_interval: timer::T1,
            timers: HashMap::new(),
        };
        txn.arm(TimerName::A, timer::T1, now);
        txn.arm(TimerName::B, timer::timer_64t1(), now);
        (txn, vec![Effect::SendRequest(request, destination)])
    }

    pub fn new_client_non_invite(key: TransactionKey, request: Request, destination: SocketAddr, now: Instant) -> (Transaction, Vec<Effect>) {
        let mut txn = Transaction {
            key,
            role: Role::Client,
            kind: Kind::NonInvite,
            state: State::Trying,
            request: request.clone(),
            destination,
            last_provisional: None,
            last_final: None,
            cached_ack: None,
            retransmit_interval: timer::T1,
            timers: HashMap::new(),
        };
        txn.arm(TimerName::E, timer::T1, now);
        txn.arm(TimerName::F, timer::timer_64t1(), now);
        (txn, vec![Effect::SendRequest(request, destination)])
    }

    pub fn new_server_invite(key: TransactionKey, request: Request, source: SocketAddr, now: Instant) -> (Transaction, Vec<Effect>) {
        let mut txn = Transaction {
            key,
            role: Role::Server,
            kind: Kind::Invite,
            state: State::Proceeding,
            request: request.clone(),
            destination: source,
            last_provisional: None,
            last_final: None,
            cached_ack: None,
            retransmit_interval: timer::T1,
            timers: HashMap::new(),
        };
        txn.arm(TimerName::Provisional100, timer::provisional_100_delay(), now);
        (txn, vec![Effect::Notify(crate::event::TransactionEvent::RequestReceived(request))])
    }

    pub fn new_server_non_invite(key: TransactionKey, request: Request, source: SocketAddr, _now: Instant) -> (Transaction, Vec<Effect>) {
        let txn = Transaction {
            key,
            role: Role::Server,
            kind: Kind::NonInvite,
            state: State::Trying,
            request: request.clone(),
            destination: source,
            last_provisional: None,
            last_final: None,
            cached_ack: None,
            retransmit_interval: timer::T1,
            timers: HashMap::new(),
        };
        (txn, vec![Effect::Notify(crate::event::TransactionEvent::RequestReceived(request))])
    }

    // ---- client side: response handling ----

    pub fn on_response(&mut self, response: Response, now: Instant) -> Vec<Effect> {
        debug_assert_eq!(self.role, Role::Client);
        match self.kind {
            Kind::NonInvite => self.on_response_non_invite(response, now),
            Kind::Invite => self.on_response_invite(response, now),
        }
    }

    fn on_response_non_invite(&mut self, response: Response, now: Instant) -> Vec<Effect> {
        if self.state.is_terminated() {
            return vec![];
        }
        if response.status.is_provisional() {
            if matches!(self.state, State::Trying | State::Proceeding) {
                self.state = State::Proceeding;
                return vec![Effect::Notify(crate::event::TransactionEvent::ResponseReceived(response))];
            }
            return vec![];
        }
        if self.state == State::Completed {
            // Retransmitted/duplicate final response, already reported once.
            return vec![];
        }
        self.disarm(TimerName::E);
        self.disarm(TimerName::F);
        self.state = State::Completed;
        self.arm(TimerName::K, timer::timer_k(), now);
        self.last_final = Some(response.clone());
        vec![Effect::Notify(crate::event::TransactionEvent::ResponseReceived(response))]
    }

    fn on_response_invite(&mut self, response: Response, now: Instant) -> Vec<Effect> {
        if self.state.is_terminated() {
            return vec![];
        }
        if response.status.is_provisional() {
            if matches!(self.state, State::Calling | State::Proceeding) {
                self.disarm(TimerName::A);
                self.state = State::Proceeding;
                return vec![Effect::Notify(crate::event::TransactionEvent::ResponseReceived(response))];
            }
            return vec![];
        }
        if response.status.is_success() {
            // 2xx bypasses Completed; ACK is a separate transaction the
            // dialog layer generates, not this one.
            let mut effects = vec![Effect::Notify(crate::event::TransactionEvent::ResponseReceived(response))];
            effects.extend(self.set_terminated(now));
            return effects;
        }
        // Non-2xx final.
        if matches!(self.state, State::Calling | State::Proceeding) {
            self.disarm(TimerName::A);
            self.disarm(TimerName::B);
            self.state = State::Completed;
            self.arm(TimerName::D, timer::timer_d(), now);
            let ack = build_ack_for_non_2xx(&self.request, &response);
            self.cached_ack = Some(ack.clone());
            self.last_final = Some(response.clone());
            return vec![
                Effect::SendRequest(ack, self.destination),
                Effect::Notify(crate::event::TransactionEvent::ResponseReceived(response)),
            ];
        }
        if self.state == State::Completed {
            // Retransmitted non-2xx final: resend the cached ACK, absorb.
            if let Some(ack) = &self.cached_ack {
                return vec![Effect::SendRequest(ack.clone(), self.destination)];
            }
        }
        vec![]
    }

    // ---- server side: request (re)delivery and outgoing responses ----

    /// Called when the transport layer hands the manager a request that
    /// matches an already-existing server transaction (a retransmission).
    pub fn on_request_retransmit(&mut self) -> Vec<Effect> {
        debug_assert_eq!(self.role, Role::Server);
        match (self.kind, self.state) {
            (Kind::NonInvite, State::Proceeding) => self.last_provisional.clone().map(|r| vec![Effect::SendResponse(r, self.destination)]).unwrap_or_default(),
            (Kind::NonInvite, State::Completed) => self.last_final.clone().map(|r| vec![Effect::SendResponse(r, self.destination)]).unwrap_or_default(),
            (Kind::Invite, State::Proceeding) => self.last_provisional.clone().map(|r| vec![Effect::SendResponse(r, self.destination)]).unwrap_or_default(),
            (Kind::Invite, State::Completed) => self.last_final.clone().map(|r| vec![Effect::SendResponse(r, self.destination)]).unwrap_or_default(),
            _ => vec![],
        }
    }

    /// Called by the UAS façade when the TU hands down a response to send.
    pub fn send_response(&mut self, response: Response, now: Instant) -> Vec<Effect> {
        debug_assert_eq!(self.role, Role::Server);
        match self.kind {
            Kind::NonInvite => self.send_response_non_invite(response),
            Kind::Invite => self.send_response_invite(response, now),
        }
    }

    fn send_response_non_invite(&mut self, response: Response) -> Vec<Effect> {
        if response.status.is_provisional() {
            self.state = State::Proceeding;
            self.last_provisional = Some(response.clone());
        } else {
            self.state = State::Completed;
            self.last_final = Some(response.clone());
        }
        vec![Effect::SendResponse(response, self.destination)]
    }

    fn send_response_invite(&mut self, response: Response, now: Instant) -> Vec<Effect> {
        self.disarm(TimerName::Provisional100);
        if response.status.is_provisional() {
            self.last_provisional = Some(response.clone());
            return vec![Effect::SendResponse(response, self.destination)];
        }
        if response.status.is_success() {
            let mut effects = vec![Effect::SendResponse(response, self.destination)];
            effects.extend(self.set_terminated(now));
            return effects;
        }
        self.last_final = Some(response.clone());
        self.state = State::Completed;
        self.retransmit_interval = timer::T1;
        self.arm(TimerName::G, timer::T1, now);
        self.arm(TimerName::H, timer::timer_64t1(), now);
        vec![Effect::SendResponse(response, self.destination)]
    }

    /// Server INVITE transaction absorbing the ACK to its non-2xx final
    /// response (the ACK to a 2xx is a separate transaction; see spec §4.D).
    pub fn on_ack(&mut self, now: Instant) -> Vec<Effect> {
        debug_assert_eq!(self.role, Role::Server);
        debug_assert_eq!(self.kind, Kind::Invite);
        if self.state == State::Completed {
            self.disarm(TimerName::G);
            self.disarm(TimerName::H);
            self.state = State::Confirmed;
            self.arm(TimerName::I, timer::timer_i(), now);
        }
        vec![]
    }

    // ---- timers ----

    pub fn on_timer(&mut self, timer: TimerName, now: Instant) -> Vec<Effect> {
        trace!(key = ?self.key, ?timer, "timer fired");
        match timer {
            TimerName::A => self.on_timer_a(now),
            TimerName::B => self.on_timer_lifetime(now),
            TimerName::D => self.set_terminated(now),
            TimerName::E => self.on_timer_e(now),
            TimerName::F => self.on_timer_lifetime(now),
            TimerName::G => self.on_timer_g(now),
            TimerName::H => self.on_timer_lifetime(now),
            TimerName::I => self.set_terminated(now),
            TimerName::J => self.set_terminated(now),
            TimerName::K => self.set_terminated(now),
            TimerName::Provisional100 => self.on_timer_provisional_100(),
        }
    }

    fn on_timer_a(&mut self, now: Instant) -> Vec<Effect> {
        if self.state != State::Calling {
            self.disarm(TimerName::A);
            return vec![];
        }
        self.retransmit_interval = timer::double_capped(self.retransmit_interval, timer::timer_64t1());
        self.arm(TimerName::A, self.retransmit_interval, now);
        vec![Effect::SendRequest(self.request.clone(), self.destination)]
    }

    fn on_timer_e(&mut self, now: Instant) -> Vec<Effect> {
        if self.state != State::Trying {
            self.disarm(TimerName::E);
            return vec![];
        }
        self.retransmit_interval = timer::double_capped(self.retransmit_interval, timer::T4);
        self.arm(TimerName::E, self.retransmit_interval, now);
        vec![Effect::SendRequest(self.request.clone(), self.destination)]
    }

    fn on_timer_g(&mut self, now: Instant) -> Vec<Effect> {
        if self.state != State::Completed {
            self.disarm(TimerName::G);
            return vec![];
        }
        self.retransmit_interval = timer::double_capped(self.retransmit_interval, timer::T2);
        self.arm(TimerName::G, self.retransmit_interval, now);
        self.last_final.clone().map(|r| vec![Effect::SendResponse(r, self.destination)]).unwrap_or_default()
    }

    /// Timer B/F/H: a timeout while waiting for a final response/ACK.
    fn on_timer_lifetime(&mut self, now: Instant) -> Vec<Effect> {
        if self.state.is_terminated() {
            return vec![];
        }
        let mut effects = vec![Effect::Notify(crate::event::TransactionEvent::Timeout)];
        effects.extend(self.set_terminated(now));
        effects
    }

    fn on_timer_provisional_100(&mut self) -> Vec<Effect> {
        self.disarm(TimerName::Provisional100);
        if self.state == State::Proceeding && self.last_provisional.is_none() {
            let trying = reply(&self.request, StatusCode::TRYING, None);
            self.last_provisional = Some(trying.clone());
            return vec![Effect::SendResponse(trying, self.destination)];
        }
        vec![]
    }
}

/// RFC 3261 §17.1.1.3: the client INVITE transaction itself generates the
/// ACK for a non-2xx final response, reusing the INVITE's CSeq number, Via,
/// and dialog identifiers but nobody else's headers.
fn build_ack_for_non_2xx(invite: &Request, final_response: &Response) -> Request {
    let mut headers = sip_types::header::HeaderMap::new();
    if let Some(via) = invite.top_via() {
        headers.push(Header::Via(via.clone()));
    }
    if let Some(from) = invite.from_header() {
        headers.push(Header::From(from.clone()));
    }
    if let Some(to) = final_response.to_header() {
        headers.push(Header::To(to.clone()));
    }
    if let Some(call_id) = invite.call_id() {
        headers.push(Header::CallId(call_id.to_string()));
    }
    if let Some(cseq) = invite.cseq() {
        headers.push(Header::CSeq(CSeq { seq: cseq.seq, method: Method::Ack }));
    }
    if let Some(max_forwards) = invite.max_forwards() {
        headers.push(Header::MaxForwards(max_forwards));
    }
    Request::new(Method::Ack, invite.uri.clone(), headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sip_types::header::HeaderMap;
    use sip_types::param::Param;
    use sip_types::uri::{Host, Uri};
    use sip_types::via::Via;
    use std::net::{IpAddr, Ipv4Addr};

    fn dest() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 5060)
    }

    fn invite_request() -> Request {
        let mut headers = HeaderMap::new();
        headers.push(Header::Via(Via::new(
            "UDP",
            Host::Hostname("pc33.atlanta.com".into()),
            Some(5060),
            vec![Param::branch("z9hG4bK776asdhds")],
        )));
        headers.push(Header::From(sip_types::headers::NamedAddress::new(None, Uri::sip("atlanta.com")).with_tag("1")));
        headers.push(Header::To(sip_types::headers::NamedAddress::new(None, Uri::sip("biloxi.com"))));
        headers.push(Header::CallId("call-1".into()));
        headers.push(Header::CSeq(CSeq { seq: 1, method: Method::Invite }));
        headers.push(Header::MaxForwards(70));
        Request::new(Method::Invite, Uri::sip("biloxi.com"), headers)
    }

    fn key_for(request: &Request) -> TransactionKey {
        TransactionKey::for_request(request).unwrap()
    }

    #[test]
    fn client_invite_retransmits_on_timer_a_while_calling() {
        let now = Instant::now();
        let request = invite_request();
        let (mut txn, effects) = Transaction::new_client_invite(key_for(&request), request, dest(), now);
        assert!(matches!(effects[0], Effect::SendRequest(_, _)));
        assert_eq!(txn.state, State::Calling);

        let later = now + timer::T1;
        let effects = txn.on_timer(TimerName::A, later);
        assert!(matches!(effects[0], Effect::SendRequest(_, _)));
        assert_eq!(txn.retransmit_interval, timer::T1 * 2);
    }

    #[test]
    fn client_invite_2xx_terminates_immediately_bypassing_completed() {
        let now = Instant::now();
        let request = invite_request();
        let (mut txn, _) = Transaction::new_client_invite(key_for(&request), request.clone(), dest(), now);
        let ok = reply(&request, StatusCode::OK, Some("tag2"));
        let effects = txn.on_response(ok, now);
        assert_eq!(txn.state, State::Terminated);
        assert!(effects.iter().any(|e| matches!(e, Effect::Terminated(_))));
    }

    #[test]
    fn client_invite_non_2xx_final_sends_ack_and_completes() {
        let now = Instant::now();
        let request = invite_request();
        let (mut txn, _) = Transaction::new_client_invite(key_for(&request), request.clone(), dest(), now);
        let busy = reply(&request, StatusCode::new(486).unwrap(), Some("tag2"));
        let effects = txn.on_response(busy, now);
        assert_eq!(txn.state, State::Completed);
        let ack_sent = effects.iter().any(|e| matches!(e, Effect::SendRequest(r, _) if r.method == Method::Ack));
        assert!(ack_sent);
    }

    #[test]
    fn client_invite_timer_d_terminates_from_completed() {
        let now = Instant::now();
        let request = invite_request();
        let (mut txn, _) = Transaction::new_client_invite(key_for(&request), request.clone(), dest(), now);
        let busy = reply(&request, StatusCode::new(486).unwrap(), Some("tag2"));
        txn.on_response(busy, now);
        let effects = txn.on_timer(TimerName::D, now + timer::timer_d());
        assert_eq!(txn.state, State::Terminated);
        assert!(effects.iter().any(|e| matches!(e, Effect::Terminated(_))));
    }

    #[test]
    fn client_non_invite_stops_retransmitting_in_proceeding() {
        let now = Instant::now();
        let mut request = invite_request();
        request.method = Method::Options;
        let (mut txn, _) = Transaction::new_client_non_invite(key_for(&request), request.clone(), dest(), now);
        let trying = reply(&request, StatusCode::TRYING, None);
        txn.on_response(trying, now);
        assert_eq!(txn.state, State::Proceeding);
        // Timer E firing in Proceeding is a stale timer and is a no-op.
        let effects = txn.on_timer(TimerName::E, now + timer::T1);
        assert!(effects.is_empty());
    }

    #[test]
    fn server_invite_sends_auto_100_trying_after_grace_period() {
        let now = Instant::now();
        let request = invite_request();
        let (mut txn, _) = Transaction::new_server_invite(key_for(&request), request, dest(), now);
        let effects = txn.on_timer(TimerName::Provisional100, now + timer::provisional_100_delay());
        assert!(effects.iter().any(|e| matches!(e, Effect::SendResponse(r, _) if r.status == StatusCode::TRYING)));
    }

    #[test]
    fn server_invite_no_auto_100_if_tu_already_responded() {
        let now = Instant::now();
        let request = invite_request();
        let (mut txn, _) = Transaction::new_server_invite(key_for(&request), request.clone(), dest(), now);
        let ringing = reply(&request, StatusCode::RINGING, Some("tag2"));
        txn.send_response(ringing, now);
        let effects = txn.on_timer(TimerName::Provisional100, now + timer::provisional_100_delay());
        assert!(effects.is_empty());
    }

    #[test]
    fn server_invite_confirmed_after_ack_then_terminated_on_timer_i() {
        let now = Instant::now();
        let request = invite_request();
        let (mut txn, _) = Transaction::new_server_invite(key_for(&request), request.clone(), dest(), now);
        let busy = reply(&request, StatusCode::new(486).unwrap(), Some("tag2"));
        txn.send_response(busy, now);
        assert_eq!(txn.state, State::Completed);
        txn.on_ack(now);
        assert_eq!(txn.state, State::Confirmed);
        let effects = txn.on_timer(TimerName::I, now + timer::timer_i());
        assert_eq!(txn.state, State::Terminated);
        assert!(effects.iter().any(|e| matches!(e, Effect::Terminated(_))));
    }

    #[test]
    fn server_invite_2xx_terminates_immediately() {
        let now = Instant::now();
        let request = invite_request();
        let (mut txn, _) = Transaction::new_server_invite(key_for(&request), request.clone(), dest(), now);
        let ok = reply(&request, StatusCode::OK, Some("tag2"));
        let effects = txn.send_response(ok, now);
        assert_eq!(txn.state, State::Terminated);
        assert!(effects.iter().any(|e| matches!(e, Effect::Terminated(_))));
    }

    #[test]
    fn server_non_invite_absorbs_retransmit_by_resending_final() {
        let now = Instant::now();
        let mut request = invite_request();
        request.method = Method::Options;
        let (mut txn, _) = Transaction::new_server_non_invite(key_for(&request), request.clone(), dest(), now);
        let ok = reply(&request, StatusCode::OK, None);
        txn.send_response(ok, now);
        let effects = txn.on_request_retransmit();
        assert!(effects.iter().any(|e| matches!(e, Effect::SendResponse(r, _) if r.status == StatusCode::OK)));
    }
}
