//! The transaction registry: matches inbound messages to existing
//! transactions, creates new ones, and drives their timers (spec §4.D,
//! §5 "registry keyed by opaque string/struct keys").

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use sip_types::header::{Header, HeaderMap};
use sip_types::headers::CSeq;
use sip_types::message::{Request, Response};
use sip_types::method::Method;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, trace, warn};

use sip_transport::{TransportHandler, UdpTransport};

use crate::error::{Error, Result};
use crate::event::TransactionEvent;
use crate::key::TransactionKey;
use crate::state::{Kind, State};
use crate::transaction::{Effect, Transaction};

const SWEEP_INTERVAL: Duration = Duration::from_millis(20);

/// Owns every live transaction and the UDP transport underneath them. One
/// instance per `UserAgent` (spec §5: "registry ... read by the manager,
/// written only by the owning actor").
pub struct TransactionManager {
    transport: Arc<UdpTransport>,
    entries: DashMap<TransactionKey, Arc<Mutex<Transaction>>>,
    owner: mpsc::UnboundedSender<TransactionEvent>,
}

impl TransactionManager {
    pub fn new(transport: Arc<UdpTransport>, owner: mpsc::UnboundedSender<TransactionEvent>) -> Arc<Self> {
        let manager = Arc::new(TransactionManager { transport, entries: DashMap::new(), owner });
        manager.clone().spawn_timer_sweep();
        manager
    }

    fn spawn_timer_sweep(self: Arc<Self>) {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(SWEEP_INTERVAL).await;
                self.sweep_timers().await;
            }
        });
    }

    async fn sweep_timers(&self) {
        let now = Instant::now();
        let keys: Vec<TransactionKey> = self.entries.iter().map(|e| e.key().clone()).collect();
        for key in keys {
            let Some(slot) = self.entries.get(&key).map(|e| e.clone()) else { continue };
            let due = {
                let txn = slot.lock().await;
                txn.due_timers(now)
            };
            for timer in due {
                let effects = {
                    let mut txn = slot.lock().await;
                    txn.on_timer(timer, now)
                };
                self.apply_effects(effects).await;
            }
        }
    }

    async fn apply_effects(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::SendRequest(request, destination) => {
                    if let Err(e) = self.transport.send_request(&request, Some(destination)).await {
                        warn!(error = %e, "failed to send transaction request");
                    }
                }
                Effect::SendResponse(response, destination) => {
                    if let Err(e) = self.transport.send_response(&response, destination).await {
                        warn!(error = %e, "failed to send transaction response");
                    }
                }
                Effect::Notify(event) => {
                    let _ = self.owner.send(event);
                }
                Effect::Terminated(key) => {
                    self.entries.remove(&key);
                    trace!(?key, "removed terminated transaction from registry");
                }
            }
        }
    }

    // ---- client-side creation ----

    pub async fn start_client_invite(&self, request: Request, destination: SocketAddr) -> Result<TransactionKey> {
        let key = TransactionKey::for_request(&request).ok_or_else(|| Error::MissingVia(request.method.to_string()))?;
        let now = Instant::now();
        let (txn, effects) = Transaction::new_client_invite(key.clone(), request, destination, now);
        self.entries.insert(key.clone(), Arc::new(Mutex::new(txn)));
        self.apply_effects(effects).await;
        Ok(key)
    }

    pub async fn start_client_non_invite(&self, request: Request, destination: SocketAddr) -> Result<TransactionKey> {
        let key = TransactionKey::for_request(&request).ok_or_else(|| Error::MissingVia(request.method.to_string()))?;
        let now = Instant::now();
        let (txn, effects) = Transaction::new_client_non_invite(key.clone(), request, destination, now);
        self.entries.insert(key.clone(), Arc::new(Mutex::new(txn)));
        self.apply_effects(effects).await;
        Ok(key)
    }

    /// Spec §4.D "a cancel operation": sends CANCEL in a paired non-INVITE
    /// transaction carrying the same branch as the INVITE it cancels.
    pub async fn cancel(&self, invite_key: &TransactionKey) -> Result<TransactionKey> {
        let slot = self.entries.get(invite_key).map(|e| e.clone()).ok_or_else(|| Error::AlreadyTerminated(invite_key.branch.clone()))?;
        let invite_request = {
            let txn = slot.lock().await;
            txn.request.clone()
        };
        let mut headers = HeaderMap::new();
        if let Some(via) = invite_request.top_via() {
            headers.push(Header::Via(via.clone()));
        }
        if let Some(from) = invite_request.from_header() {
            headers.push(Header::From(from.clone()));
        }
        if let Some(to) = invite_request.to_header() {
            headers.push(Header::To(to.clone()));
        }
        if let Some(call_id) = invite_request.call_id() {
            headers.push(Header::CallId(call_id.to_string()));
        }
        let seq = invite_request.cseq().map(|c| c.seq).unwrap_or(1);
        headers.push(Header::CSeq(CSeq { seq, method: Method::Cancel }));
        if let Some(max_forwards) = invite_request.max_forwards() {
            headers.push(Header::MaxForwards(max_forwards));
        }
        let cancel_request = Request::new(Method::Cancel, invite_request.uri.clone(), headers);
        let destination = invite_request.source.as_ref().map(|s| s.remote).unwrap_or_else(|| default_destination(&invite_request));
        self.start_client_non_invite(cancel_request, destination).await
    }

    // ---- server-side: send a response down an existing transaction ----

    pub async fn send_response(&self, key: &TransactionKey, response: Response) -> Result<()> {
        let slot = self.entries.get(key).map(|e| e.clone()).ok_or_else(|| Error::AlreadyTerminated(key.branch.clone()))?;
        let effects = {
            let mut txn = slot.lock().await;
            txn.send_response(response, Instant::now())
        };
        self.apply_effects(effects).await;
        Ok(())
    }

    // ---- inbound dispatch (also see the `TransportHandler` impl below) ----

    async fn handle_request(&self, request: Request) {
        let Some(key) = TransactionKey::for_request(&request) else {
            warn!("dropping request with no usable Via/branch");
            return;
        };
        if let Some(slot) = self.entries.get(&key).map(|e| e.clone()) {
            let mut txn = slot.lock().await;
            let effects = if request.method == Method::Ack {
                txn.on_ack(Instant::now())
            } else {
                txn.on_request_retransmit()
            };
            drop(txn);
            self.apply_effects(effects).await;
            return;
        }
        if request.method == Method::Ack {
            // ACK to a 2xx: the INVITE server transaction already
            // terminated and was removed. This ACK belongs to the dialog
            // layer, not a new transaction (RFC 3261 §13.3.1.4).
            let _ = self.owner.send(TransactionEvent::RequestReceived(request));
            return;
        }
        let source = request.source.as_ref().map(|s| s.remote).unwrap_or_else(|| default_destination(&request));
        let now = Instant::now();
        let (txn, effects) = if request.method.is_invite() {
            Transaction::new_server_invite(key.clone(), request, source, now)
        } else {
            Transaction::new_server_non_invite(key.clone(), request, source, now)
        };
        debug!(?key, state = txn.state.name(), "new server transaction");
        self.entries.insert(key, Arc::new(Mutex::new(txn)));
        self.apply_effects(effects).await;
    }

    async fn handle_response(&self, response: Response) {
        let Some(key) = TransactionKey::for_response(&response) else {
            warn!("dropping response with no usable Via/CSeq");
            return;
        };
        let Some(slot) = self.entries.get(&key).map(|e| e.clone()) else {
            trace!(?key, "response matches no transaction, dropping");
            return;
        };
        let effects = {
            let mut txn = slot.lock().await;
            txn.on_response(response, Instant::now())
        };
        self.apply_effects(effects).await;
    }

    /// Present for tests/diagnostics; production state changes always flow
    /// through `handle_request`/`handle_response`.
    pub fn state_of(&self, key: &TransactionKey) -> Option<State> {
        self.entries.get(key).and_then(|e| e.try_lock().ok().map(|t| t.state))
    }

    pub fn kind_of(&self, key: &TransactionKey) -> Option<Kind> {
        self.entries.get(key).and_then(|e| e.try_lock().ok().map(|t| t.kind))
    }

    /// The request that started a transaction, needed by callers that
    /// build a correlated response/request outside the normal
    /// `handle_request`/`send_response` flow (e.g. a 487 on CANCEL,
    /// RFC 3261 §9.2).
    pub fn request_of(&self, key: &TransactionKey) -> Option<Request> {
        self.entries.get(key).and_then(|e| e.try_lock().ok().map(|t| t.request.clone()))
    }

    pub fn transport_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }
}

fn default_destination(request: &Request) -> SocketAddr {
    let port = request.uri.port.unwrap_or(5060);
    match &request.uri.host {
        sip_types::uri::Host::Ipv4(a) => SocketAddr::new((*a).into(), port),
        sip_types::uri::Host::Ipv6(a) => SocketAddr::new((*a).into(), port),
        sip_types::uri::Host::Hostname(_) => SocketAddr::new(std::net::Ipv4Addr::LOCALHOST.into(), port),
    }
}

#[async_trait::async_trait]
impl TransportHandler for TransactionManager {
    async fn transp_request(&self, request: Request) {
        self.handle_request(request).await;
    }

    async fn transp_response(&self, response: Response) {
        self.handle_response(response).await;
    }
}
