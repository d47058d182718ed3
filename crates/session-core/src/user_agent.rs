//! The top-level `UserAgent` (spec §3 "User agent", §4.F/§4.G glue): wires
//! transport, transaction, dialog, and media together and runs the
//! dispatch loop that turns `TransactionEvent`s into UAC/UAS callbacks.
//! Grounded on the teacher's own coordinator, which wires the same four
//! layers the same way (`rvoip-session-core::coordinator`).

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use sip_dialog::DialogManager;
use sip_parse::branch::generate_branch;
use sip_transaction::{State, TransactionEvent, TransactionKey, TransactionManager};
use sip_transport::{TransportConfig, UdpTransport};
use sip_types::dialog_id::DialogKey;
use sip_types::header::{Header, HeaderMap};
use sip_types::headers::{CSeq, ContentType, NamedAddress};
use sip_types::message::{reply, Request, Response};
use sip_types::method::Method;
use sip_types::status::StatusCode;
use sip_types::uri::{Host, Uri};
use sip_types::via::Via;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::handler::{UacAckAction, UacHandler, UacRedirectAction, UasAction, UasHandler};
use crate::media_session::{MediaSession, Role};
use crate::registry::MediaRegistry;

/// State kept between sending an INVITE and learning whether it was
/// accepted, indexed by the client INVITE transaction's key. Holds the
/// request (needed to derive the dialog once a final response arrives)
/// and the media session created for the offer it carried.
struct PendingInvite {
    request: Request,
    media_session: MediaSession,
}

pub struct UserAgent {
    config: Config,
    transport: Arc<UdpTransport>,
    transactions: Arc<TransactionManager>,
    dialogs: Arc<DialogManager>,
    media: Arc<MediaRegistry>,
    pending_invites: DashMap<TransactionKey, PendingInvite>,
    uas_handler: Arc<dyn UasHandler>,
    uac_handler: Arc<dyn UacHandler>,
    next_media_id: AtomicU64,
}

impl UserAgent {
    pub async fn new(config: Config, uas_handler: Arc<dyn UasHandler>, uac_handler: Arc<dyn UacHandler>) -> Result<Arc<Self>> {
        let transport_config = TransportConfig {
            listen_addr: config.transport.listen_addr,
            listen_port: config.transport.listen_port,
            exposed_addr: config.transport.exposed_addr,
            exposed_port: config.transport.exposed_port,
            max_burst: config.transport.max_burst,
            sip_trace: config.transport.sip_trace,
        };
        let transport = UdpTransport::bind_unstarted(transport_config).await?;
        let (owner_tx, owner_rx) = mpsc::unbounded_channel();
        let transactions = TransactionManager::new(transport.clone(), owner_tx);
        transport.clone().start(transactions.clone());

        let ua = Arc::new(UserAgent {
            config,
            transport,
            transactions,
            dialogs: DialogManager::new(),
            media: MediaRegistry::new(),
            pending_invites: DashMap::new(),
            uas_handler,
            uac_handler,
            next_media_id: AtomicU64::new(1),
        });
        tokio::spawn(ua.clone().run_dispatch(owner_rx));
        Ok(ua)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    fn local_uri(&self) -> Uri {
        self.transport.local_uri()
    }

    fn next_media_id(&self) -> u64 {
        self.next_media_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Places an outbound call (spec §4.F UAC path): builds the initial
    /// INVITE with a freshly negotiated SDP offer and hands it to the
    /// transaction layer. The returned key identifies the client INVITE
    /// transaction until a final response promotes it to a dialog.
    pub async fn call(self: &Arc<Self>, target: Uri) -> Result<TransactionKey> {
        let local = self.local_addr();
        let destination = resolve_uri(&target)?;
        let call_id = uuid::Uuid::new_v4().to_string();
        let from_tag = uuid::Uuid::new_v4().to_string();
        let contact = self.local_uri();

        let mut session = MediaSession::new(self.next_media_id(), DialogKey::new(call_id.clone(), from_tag.clone(), ""), Role::Uac, local.ip());
        let offer = session
            .generate_offer(&self.config.media.supported_codecs, self.config.media.rtp_port_range, self.config.media.max_port_attempts)
            .await?;

        let mut headers = HeaderMap::new();
        headers.push(Header::Via(Via::new("UDP", ip_to_host(local.ip()), Some(local.port()), vec![sip_types::param::Param::branch(generate_branch())])));
        headers.push(Header::From(NamedAddress::new(None, contact.clone()).with_tag(from_tag)));
        headers.push(Header::To(NamedAddress::new(None, target.clone())));
        headers.push(Header::CallId(call_id));
        headers.push(Header::CSeq(CSeq { seq: 1, method: Method::Invite }));
        headers.push(Header::Contact(NamedAddress::new(None, contact)));
        headers.push(Header::MaxForwards(self.config.uas_options.max_forwards));
        let mut request = Request::new(Method::Invite, target, headers);
        request.set_body(offer.into_bytes(), Some(ContentType::sdp()));

        let key = self.transactions.start_client_invite(request.clone(), destination).await?;
        self.pending_invites.insert(key.clone(), PendingInvite { request, media_session: session });
        debug!(?key, "placed outbound call");
        Ok(key)
    }

    /// Sends CANCEL for a call still in the early-dialog window (spec
    /// §4.D "a cancel operation"). Returns the CANCEL's own transaction
    /// key, separate from `invite_key`.
    pub async fn cancel(&self, invite_key: &TransactionKey) -> Result<TransactionKey> {
        Ok(self.transactions.cancel(invite_key).await?)
    }

    /// Hangs up an established call (spec §8 scenario 2 "UAC calls and
    /// hangs up"): builds a BYE through the dialog, tears down its media
    /// session, and sends it as a fresh non-INVITE client transaction.
    pub async fn hangup(&self, dialog_key: &DialogKey) -> Result<()> {
        let local = self.local_addr();
        let via = Via::new("UDP", ip_to_host(local.ip()), Some(local.port()), vec![sip_types::param::Param::branch(generate_branch())]);
        let request = self.dialogs.build_request(dialog_key, Method::Bye, via, self.config.uas_options.max_forwards).await?;
        let destination = resolve_uri(&request.uri)?;
        let _ = self.media.with_session(dialog_key, |s| s.terminate()).await;
        self.media.remove(dialog_key);
        self.transactions.start_client_non_invite(request, destination).await?;
        self.dialogs.remove(dialog_key);
        Ok(())
    }

    async fn run_dispatch(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<TransactionEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                TransactionEvent::RequestReceived(request) => self.clone().handle_request(request).await,
                TransactionEvent::ResponseReceived(response) => self.clone().handle_response(response).await,
                TransactionEvent::Timeout => {
                    warn!("transaction timed out without a final response");
                    self.uac_handler.handle_error("transaction timeout").await;
                }
                TransactionEvent::TransportError(reason) => {
                    warn!(%reason, "transport error reported by a transaction");
                    self.uac_handler.handle_error(&reason).await;
                }
                TransactionEvent::Terminated(key) => {
                    if self.pending_invites.remove(&key).is_some() {
                        debug!(?key, "pending invite transaction terminated without a final response reaching the dialog layer");
                    }
                }
            }
        }
    }

    // ---- inbound requests (UAS path, spec §4.F) ----

    async fn handle_request(self: Arc<Self>, request: Request) {
        if request.method == Method::Ack {
            self.uas_handler.handle_ack(&request).await;
            return;
        }
        if request.method.is_invite() {
            self.handle_invite(request).await;
            return;
        }
        match self.dialogs.handle_incoming_request(&request).await {
            Ok(dialog_key) => self.handle_in_dialog_request(request, dialog_key).await,
            Err(_) => self.handle_standalone_request(request).await,
        }
    }

    async fn handle_invite(self: Arc<Self>, request: Request) {
        let Some(tx_key) = TransactionKey::for_request(&request) else {
            warn!("dropping INVITE with no usable branch");
            return;
        };
        self.uas_handler.trying(&request).await;
        let action = self.uas_handler.handle_invite(&request).await;
        let to_tag = uuid::Uuid::new_v4().to_string();

        match action {
            UasAction::Respond { status, reason, headers: _, body: _ } if status.is_success() => {
                self.accept_invite(&request, &tx_key, status, reason, to_tag).await;
            }
            UasAction::Respond { status, reason, headers, body } => {
                let mut response = reply(&request, status, Some(&to_tag));
                if let Some(reason) = reason {
                    response.reason = reason;
                }
                for header in headers {
                    response.headers.push(header);
                }
                if !body.is_empty() {
                    response.set_body(body, Some(ContentType::sdp()));
                }
                self.send_final(&tx_key, response).await;
            }
            UasAction::Proxy { .. } => {
                warn!("UAS proxying is out of scope; responding 501");
                self.send_final(&tx_key, reply(&request, StatusCode::NOT_IMPLEMENTED, None)).await;
            }
            UasAction::NoReply => {}
            UasAction::Stop { reason } => {
                warn!(%reason, "UAS handler stopped INVITE processing");
                self.send_final(&tx_key, reply(&request, StatusCode::SERVER_INTERNAL_ERROR, None)).await;
            }
        }
    }

    async fn accept_invite(self: &Arc<Self>, request: &Request, tx_key: &TransactionKey, status: StatusCode, reason: Option<String>, to_tag: String) {
        let offer_sdp = String::from_utf8_lossy(&request.body).to_string();
        let mut session = MediaSession::new(self.next_media_id(), DialogKey::new("", "", ""), Role::Uas, self.local_addr().ip());
        let answer = match session
            .process_offer(&offer_sdp, &self.config.media.supported_codecs, self.config.media.rtp_port_range, self.config.media.max_port_attempts)
            .await
        {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "SDP offer negotiation failed");
                self.send_final(tx_key, reply(request, StatusCode::NOT_ACCEPTABLE_HERE, None)).await;
                return;
            }
        };

        let mut response = reply(request, status, Some(&to_tag));
        if let Some(reason) = reason {
            response.reason = reason;
        }
        response.headers.push(Header::Contact(NamedAddress::new(None, self.local_uri())));
        response.set_body(answer.into_bytes(), Some(ContentType::sdp()));

        let dialog_key = match self.dialogs.create_from_uas_response(request, &response, Some(tx_key.clone())).await {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "failed to establish dialog for accepted INVITE");
                self.send_final(tx_key, reply(request, StatusCode::SERVER_INTERNAL_ERROR, None)).await;
                return;
            }
        };
        session.dialog_key = dialog_key.clone();
        self.media.insert(session);
        if let Err(e) = self.media.with_session(&dialog_key, |s| s.start_media()).await.and_then(|r| r) {
            warn!(error = %e, "failed to start media pipeline");
        }
        self.send_final(tx_key, response).await;
    }

    async fn handle_in_dialog_request(self: Arc<Self>, request: Request, dialog_key: DialogKey) {
        let Some(tx_key) = TransactionKey::for_request(&request) else {
            warn!("dropping in-dialog request with no usable branch");
            return;
        };
        match request.method.clone() {
            Method::Bye => {
                let _ = self.media.with_session(&dialog_key, |s| s.terminate()).await;
                self.media.remove(&dialog_key);
                let action = self.uas_handler.handle_bye(&request).await;
                self.respond_from_action(&request, &tx_key, action).await;
                self.dialogs.remove(&dialog_key);
            }
            Method::Cancel => {
                let action = self.uas_handler.handle_cancel(&request).await;
                self.respond_from_action(&request, &tx_key, action).await;
                self.terminate_invite_for_cancel(&request).await;
            }
            Method::Options => {
                let action = self.uas_handler.handle_options(&request).await;
                self.respond_from_action(&request, &tx_key, action).await;
            }
            Method::Info => {
                let action = self.uas_handler.handle_info(&request).await;
                self.respond_from_action(&request, &tx_key, action).await;
            }
            _ => {
                self.respond_from_action(&request, &tx_key, UasAction::respond(StatusCode::NOT_IMPLEMENTED)).await;
            }
        }
    }

    async fn handle_standalone_request(self: Arc<Self>, request: Request) {
        let Some(tx_key) = TransactionKey::for_request(&request) else {
            warn!("dropping standalone request with no usable branch");
            return;
        };
        let action = match request.method {
            Method::Options => self.uas_handler.handle_options(&request).await,
            Method::Register => self.uas_handler.handle_register(&request).await,
            Method::Subscribe => self.uas_handler.handle_subscribe(&request).await,
            Method::Notify => self.uas_handler.handle_notify(&request).await,
            Method::Publish => self.uas_handler.handle_publish(&request).await,
            Method::Message => self.uas_handler.handle_message(&request).await,
            Method::Cancel => self.uas_handler.handle_cancel(&request).await,
            _ => UasAction::respond(StatusCode::NOT_IMPLEMENTED),
        };
        self.respond_from_action(&request, &tx_key, action).await;
        if request.method == Method::Cancel {
            self.terminate_invite_for_cancel(&request).await;
        }
    }

    /// RFC 3261 §9.2: a CANCEL answered 200 OK also terminates the INVITE
    /// server transaction it targets with 487 Request Terminated, but only
    /// while that transaction is still in Proceeding (no final response
    /// sent yet). A CANCEL that loses the race against the TU's own final
    /// response has no further effect here.
    async fn terminate_invite_for_cancel(&self, cancel: &Request) {
        let Some(invite_key) = TransactionKey::for_cancel(cancel) else {
            return;
        };
        if self.transactions.state_of(&invite_key) != Some(State::Proceeding) {
            return;
        }
        let Some(invite_request) = self.transactions.request_of(&invite_key) else {
            return;
        };
        let response = reply(&invite_request, StatusCode::REQUEST_TERMINATED, None);
        self.send_final(&invite_key, response).await;
    }

    async fn respond_from_action(&self, request: &Request, tx_key: &TransactionKey, action: UasAction) {
        match action {
            UasAction::Respond { status, reason, headers, body } => {
                let mut response = reply(request, status, None);
                if let Some(reason) = reason {
                    response.reason = reason;
                }
                for header in headers {
                    response.headers.push(header);
                }
                if !body.is_empty() {
                    response.set_body(body, None);
                }
                self.send_final(tx_key, response).await;
            }
            UasAction::Proxy { .. } => {
                self.send_final(tx_key, reply(request, StatusCode::NOT_IMPLEMENTED, None)).await;
            }
            UasAction::NoReply => {}
            UasAction::Stop { reason } => {
                warn!(%reason, "UAS handler stopped request processing");
                self.send_final(tx_key, reply(request, StatusCode::SERVER_INTERNAL_ERROR, None)).await;
            }
        }
    }

    async fn send_final(&self, tx_key: &TransactionKey, response: Response) {
        if let Err(e) = self.transactions.send_response(tx_key, response).await {
            warn!(error = %e, "failed to send response");
        }
    }

    // ---- inbound responses (UAC path, spec §4.F) ----

    async fn handle_response(self: Arc<Self>, response: Response) {
        if response.cseq().map(|c| c.method.clone()) != Some(Method::Invite) {
            return;
        }
        let Some(key) = TransactionKey::for_response(&response) else {
            warn!("dropping response with no usable branch/CSeq");
            return;
        };

        if response.status.is_provisional() {
            self.uac_handler.handle_provisional(&response).await;
            return;
        }

        let Some((_, pending)) = self.pending_invites.remove(&key) else {
            trace_no_pending(&key);
            return;
        };

        if response.status.is_success() {
            self.finish_uac_invite(key, pending, response).await;
        } else {
            self.fail_uac_invite(response).await;
        }
    }

    async fn finish_uac_invite(self: Arc<Self>, invite_key: TransactionKey, mut pending: PendingInvite, response: Response) {
        let dialog_key = match self.dialogs.create_from_uac_response(&pending.request, &response, Some(invite_key)).await {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "failed to establish dialog for accepted call");
                self.uac_handler.handle_error(&e.to_string()).await;
                return;
            }
        };

        let answer_sdp = String::from_utf8_lossy(&response.body).to_string();
        if let Err(e) = pending.media_session.process_answer(&answer_sdp) {
            warn!(error = %e, "failed to process SDP answer");
            self.uac_handler.handle_error(&e.to_string()).await;
            return;
        }
        pending.media_session.dialog_key = dialog_key.clone();
        self.media.insert(pending.media_session);
        if let Err(e) = self.media.with_session(&dialog_key, |s| s.start_media()).await.and_then(|r| r) {
            warn!(error = %e, "failed to start media pipeline");
        }

        let local = self.local_addr();
        let invite_seq = pending.request.cseq().map(|c| c.seq).unwrap_or(1);
        let ack_action = self.uac_handler.handle_success(&response).await;
        let via = Via::new("UDP", ip_to_host(local.ip()), Some(local.port()), vec![sip_types::param::Param::branch(generate_branch())]);
        let mut ack = match self.dialogs.build_ack(&dialog_key, invite_seq, via).await {
            Ok(ack) => ack,
            Err(e) => {
                warn!(error = %e, "failed to build ACK");
                return;
            }
        };
        if let UacAckAction::SendAck { body } = ack_action {
            ack.set_body(body, Some(ContentType::sdp()));
        }
        let destination = response.source.as_ref().map(|s| s.remote).unwrap_or_else(|| default_port(&pending.request));
        if let Err(e) = self.transport.send_request(&ack, Some(destination)).await {
            warn!(error = %e, "failed to send ACK");
        }
        self.uac_handler.handle_call_established(&response).await;
    }

    /// Spec §4.F "follow 3xx when the handler returns `follow_redirect` and
    /// a Contact is present": re-places the call at the Contact URI as a
    /// fresh INVITE, entirely independent of the redirected-away dialog
    /// attempt (new Call-ID, new From-tag, new media session).
    async fn fail_uac_invite(self: &Arc<Self>, response: Response) {
        if response.status.class() == 3 {
            let action = self.uac_handler.handle_redirect(&response).await;
            if matches!(action, UacRedirectAction::FollowRedirect) {
                if let Some(contact) = response.contact() {
                    let target = contact.uri.clone();
                    debug!(%target, "following redirect");
                    match self.call(target).await {
                        Ok(_) => return,
                        Err(e) => warn!(error = %e, "failed to follow redirect"),
                    }
                } else {
                    warn!("handler requested follow_redirect but response carried no Contact");
                }
            }
        } else {
            match response.status.class() {
                4 => self.uac_handler.handle_client_error(&response).await,
                5 => self.uac_handler.handle_server_error(&response).await,
                6 => self.uac_handler.handle_global_failure(&response).await,
                _ => {}
            }
        }
        self.uac_handler.handle_call_ended(&format!("INVITE failed with {}", response.status)).await;
    }
}

fn trace_no_pending(key: &TransactionKey) {
    debug!(?key, "final response matches no pending invite (late retransmission?)");
}

fn ip_to_host(ip: IpAddr) -> Host {
    match ip {
        IpAddr::V4(a) => Host::Ipv4(a),
        IpAddr::V6(a) => Host::Ipv6(a),
    }
}

fn resolve_uri(uri: &Uri) -> Result<SocketAddr> {
    let port = uri.port.unwrap_or(5060);
    let ip = match &uri.host {
        Host::Ipv4(a) => IpAddr::V4(*a),
        Host::Ipv6(a) => IpAddr::V6(*a),
        Host::Hostname(h) => return Err(Error::Transport(sip_transport::Error::InvalidDestination(format!("{h}:{port} (hostname resolution out of scope)")))),
    };
    Ok(SocketAddr::new(ip, port))
}

fn default_port(request: &Request) -> SocketAddr {
    resolve_uri(&request.uri).unwrap_or_else(|_| SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 5060))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;

    struct AcceptingUas;

    #[async_trait]
    impl UasHandler for AcceptingUas {
        async fn handle_invite(&self, _request: &Request) -> UasAction {
            UasAction::respond(StatusCode::OK)
        }
    }

    struct RingingUas {
        canceled: AtomicBool,
    }

    #[async_trait]
    impl UasHandler for RingingUas {
        async fn handle_invite(&self, _request: &Request) -> UasAction {
            UasAction::NoReply
        }

        async fn handle_cancel(&self, _request: &Request) -> UasAction {
            self.canceled.store(true, AtomicOrdering::SeqCst);
            UasAction::respond(StatusCode::OK)
        }
    }

    struct RecordingUac {
        established: AtomicBool,
    }

    #[async_trait]
    impl UacHandler for RecordingUac {
        async fn handle_call_established(&self, _response: &Response) {
            self.established.store(true, AtomicOrdering::SeqCst);
        }
    }

    struct RedirectingUas {
        target: Uri,
    }

    #[async_trait]
    impl UasHandler for RedirectingUas {
        async fn handle_invite(&self, _request: &Request) -> UasAction {
            UasAction::redirect(StatusCode::MOVED_TEMPORARILY, self.target.clone())
        }
    }

    struct RedirectFollowingUac {
        established: AtomicBool,
    }

    #[async_trait]
    impl UacHandler for RedirectFollowingUac {
        async fn handle_redirect(&self, _response: &Response) -> UacRedirectAction {
            UacRedirectAction::FollowRedirect
        }

        async fn handle_call_established(&self, _response: &Response) {
            self.established.store(true, AtomicOrdering::SeqCst);
        }
    }

    struct RecordingUasBye {
        byed: AtomicBool,
    }

    #[async_trait]
    impl UasHandler for RecordingUasBye {
        async fn handle_invite(&self, _request: &Request) -> UasAction {
            UasAction::respond(StatusCode::OK)
        }

        async fn handle_bye(&self, _request: &Request) -> UasAction {
            self.byed.store(true, AtomicOrdering::SeqCst);
            UasAction::respond(StatusCode::OK)
        }
    }

    fn local_config() -> Config {
        Config::new().with_listen_addr("127.0.0.1".parse().unwrap()).with_supported_codecs(vec![rtp_core::PayloadType::Pcma])
    }

    /// Spec §8 end-to-end scenario: a UAC calls a UAS that accepts with
    /// G.711, and the call reaches `handle_call_established`.
    #[tokio::test]
    async fn uac_calls_uas_and_reaches_established() {
        let uas = UserAgent::new(local_config(), Arc::new(AcceptingUas), Arc::new(crate::handler::DefaultUacHandler)).await.unwrap();
        let uac_handler = Arc::new(RecordingUac { established: AtomicBool::new(false) });
        let uac = UserAgent::new(local_config(), Arc::new(crate::handler::DefaultUasHandler), uac_handler.clone()).await.unwrap();

        let target = Uri::sip(uas.local_addr().ip().to_string()).with_port(uas.local_addr().port());
        uac.call(target).await.unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(uac_handler.established.load(AtomicOrdering::SeqCst));
    }

    /// Spec §8 scenario 2 "UAC calls and hangs up": after the call is
    /// established the UAC sends BYE and the UAS's `handle_bye` fires.
    #[tokio::test]
    async fn uac_hangs_up_after_established_call() {
        let uas_handler = Arc::new(RecordingUasBye { byed: AtomicBool::new(false) });
        let uas = UserAgent::new(local_config(), uas_handler.clone(), Arc::new(crate::handler::DefaultUacHandler)).await.unwrap();
        let uac_handler = Arc::new(RecordingUac { established: AtomicBool::new(false) });
        let uac = UserAgent::new(local_config(), Arc::new(crate::handler::DefaultUasHandler), uac_handler.clone()).await.unwrap();

        let target = Uri::sip(uas.local_addr().ip().to_string()).with_port(uas.local_addr().port());
        uac.call(target).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(uac_handler.established.load(AtomicOrdering::SeqCst));

        let dialog_key = uac.media.keys().into_iter().next().expect("media session registered once the call is established");
        uac.hangup(&dialog_key).await.unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(uas_handler.byed.load(AtomicOrdering::SeqCst));
        assert!(!uac.media.contains(&dialog_key));
    }

    /// Spec §8 scenario 3 "CANCEL during ringing": a CANCEL that arrives
    /// before any dialog exists is routed as a standalone request (not
    /// matched against the nonexistent dialog), gets 200 OK on its own
    /// transaction, and drives the still-Proceeding INVITE server
    /// transaction to 487 Request Terminated.
    #[tokio::test]
    async fn cancel_before_dialog_exists_is_handled_as_standalone() {
        let uas_handler = Arc::new(RingingUas { canceled: AtomicBool::new(false) });
        let uas = UserAgent::new(local_config(), uas_handler.clone(), Arc::new(crate::handler::DefaultUacHandler)).await.unwrap();
        let uac = UserAgent::new(local_config(), Arc::new(crate::handler::DefaultUasHandler), Arc::new(crate::handler::DefaultUacHandler)).await.unwrap();

        let target = Uri::sip(uas.local_addr().ip().to_string()).with_port(uas.local_addr().port());
        let invite_key = uac.call(target).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let cancel_key = uac.cancel(&invite_key).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(uas_handler.canceled.load(AtomicOrdering::SeqCst));
        assert!(uas.media.keys().is_empty());
        assert_eq!(uas.transactions.state_of(&cancel_key), Some(State::Completed));
        assert_eq!(uas.transactions.state_of(&invite_key), Some(State::Completed));
    }

    /// Spec §4.F "follows 3xx when the handler returns `follow_redirect`
    /// and a Contact is present": a UAS redirecting to a second UAS lands
    /// the call there instead of failing it.
    #[tokio::test]
    async fn uac_follows_redirect_to_contact_and_establishes_there() {
        let final_uas = UserAgent::new(local_config(), Arc::new(AcceptingUas), Arc::new(crate::handler::DefaultUacHandler)).await.unwrap();
        let final_target = Uri::sip(final_uas.local_addr().ip().to_string()).with_port(final_uas.local_addr().port());

        let redirecting_uas = UserAgent::new(local_config(), Arc::new(RedirectingUas { target: final_target }), Arc::new(crate::handler::DefaultUacHandler)).await.unwrap();
        let uac_handler = Arc::new(RedirectFollowingUac { established: AtomicBool::new(false) });
        let uac = UserAgent::new(local_config(), Arc::new(crate::handler::DefaultUasHandler), uac_handler.clone()).await.unwrap();

        let target = Uri::sip(redirecting_uas.local_addr().ip().to_string()).with_port(redirecting_uas.local_addr().port());
        uac.call(target).await.unwrap();

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(uac_handler.established.load(AtomicOrdering::SeqCst));
    }
}
