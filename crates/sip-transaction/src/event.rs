//! Notifications a transaction delivers to the layer above it (spec §4.D:
//! "a request-received event, a response-received event, ... a terminal
//! notification").

use sip_types::message::{Request, Response};

use crate::key::TransactionKey;

#[derive(Debug, Clone)]
pub enum TransactionEvent {
    /// Server-side: a new request, or a retransmission absorbed by the
    /// transaction but still surfaced so the TU can resend its cached
    /// response if one hasn't reached the transaction yet.
    RequestReceived(Request),
    /// Client-side: a provisional or final response.
    ResponseReceived(Response),
    /// Timer B/F/H fired before a final response arrived.
    Timeout,
    /// The transport layer reported a send failure.
    TransportError(String),
    /// The transaction has reached `Terminated` and its entry should be
    /// dropped from the registry.
    Terminated(TransactionKey),
}
