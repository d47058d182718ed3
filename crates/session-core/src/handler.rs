//! UAC/UAS handler capability traits (spec §4.F). Default implementations
//! return 501/log-and-continue so callers only override what they need,
//! the same shape as the teacher's `rvoip-session-core` callback traits.

use async_trait::async_trait;
use sip_types::header::Header;
use sip_types::message::{Request, Response};
use sip_types::status::StatusCode;

/// What a UAS handler wants the façade to do with one request.
pub enum UasAction {
    Respond { status: StatusCode, reason: Option<String>, headers: Vec<Header>, body: Vec<u8> },
    Proxy { uri: sip_types::uri::Uri },
    NoReply,
    Stop { reason: String },
}

impl UasAction {
    pub fn respond(status: StatusCode) -> Self {
        UasAction::Respond { status, reason: None, headers: Vec::new(), body: Vec::new() }
    }

    /// A 3xx with a Contact, the only header a handler routinely needs to
    /// attach by hand (spec §4.F "it follows 3xx when the handler returns
    /// `follow_redirect` and a Contact is present").
    pub fn redirect(status: StatusCode, contact: sip_types::uri::Uri) -> Self {
        UasAction::Respond {
            status,
            reason: None,
            headers: vec![Header::Contact(sip_types::headers::NamedAddress::new(None, contact))],
            body: Vec::new(),
        }
    }
}

/// What a UAC handler wants the façade to do after a 2xx to INVITE.
pub enum UacAckAction {
    /// Façade sends the default ACK (RFC 3261 §13.2.2.4).
    Default,
    SendAck { body: Vec<u8> },
}

/// What a UAC handler wants the façade to do with a 3xx to INVITE.
pub enum UacRedirectAction {
    /// Treat the redirect as a failed call (default).
    Ignore,
    /// Place a fresh call to the response's Contact URI. No-op if the
    /// response carries no Contact.
    FollowRedirect,
}

/// Per-method UAS callbacks (spec §4.F). Default: 501 Not Implemented for
/// every dialog-creating/standalone method, matching RFC 3261 §8.2.1's
/// instruction for unrecognized methods.
#[async_trait]
pub trait UasHandler: Send + Sync {
    async fn handle_invite(&self, _request: &Request) -> UasAction {
        UasAction::respond(StatusCode::NOT_IMPLEMENTED)
    }
    async fn handle_ack(&self, _request: &Request) -> UasAction {
        UasAction::NoReply
    }
    async fn handle_bye(&self, _request: &Request) -> UasAction {
        UasAction::respond(StatusCode::OK)
    }
    async fn handle_cancel(&self, _request: &Request) -> UasAction {
        UasAction::respond(StatusCode::OK)
    }
    async fn handle_options(&self, _request: &Request) -> UasAction {
        UasAction::respond(StatusCode::OK)
    }
    async fn handle_register(&self, _request: &Request) -> UasAction {
        UasAction::respond(StatusCode::NOT_IMPLEMENTED)
    }
    async fn handle_subscribe(&self, _request: &Request) -> UasAction {
        UasAction::respond(StatusCode::NOT_IMPLEMENTED)
    }
    async fn handle_notify(&self, _request: &Request) -> UasAction {
        UasAction::respond(StatusCode::NOT_IMPLEMENTED)
    }
    async fn handle_publish(&self, _request: &Request) -> UasAction {
        UasAction::respond(StatusCode::NOT_IMPLEMENTED)
    }
    async fn handle_message(&self, _request: &Request) -> UasAction {
        UasAction::respond(StatusCode::NOT_IMPLEMENTED)
    }
    async fn handle_info(&self, _request: &Request) -> UasAction {
        UasAction::respond(StatusCode::NOT_IMPLEMENTED)
    }

    /// INVITE server-transaction state callbacks, fired for observability
    /// only; they cannot veto the transaction's own state machine.
    async fn trying(&self, _request: &Request) {}
    async fn proceeding(&self, _request: &Request) {}
    async fn completed(&self, _request: &Request, _response: &Response) {}
}

/// Default UAS handler: logs and returns 501/ACK-noreply for everything.
/// Equivalent to the teacher's "handlers only override what they need."
pub struct DefaultUasHandler;

#[async_trait]
impl UasHandler for DefaultUasHandler {}

/// Status-class-bucketed UAC callbacks (spec §4.F).
#[async_trait]
pub trait UacHandler: Send + Sync {
    async fn handle_provisional(&self, _response: &Response) {}
    async fn handle_success(&self, _response: &Response) -> UacAckAction {
        UacAckAction::Default
    }
    async fn handle_redirect(&self, _response: &Response) -> UacRedirectAction {
        UacRedirectAction::Ignore
    }
    async fn handle_client_error(&self, _response: &Response) {}
    async fn handle_server_error(&self, _response: &Response) {}
    async fn handle_global_failure(&self, _response: &Response) {}
    async fn handle_error(&self, _reason: &str) {}
    async fn handle_call_established(&self, _response: &Response) {}
    async fn handle_call_ended(&self, _reason: &str) {}
}

pub struct DefaultUacHandler;

#[async_trait]
impl UacHandler for DefaultUacHandler {}
