//! The dispatch contract the transport layer calls into (spec §4.C
//! "dispatch to the transaction layer via the configured handler's
//! `transp_request`/`transp_response`").

use async_trait::async_trait;
use sip_types::message::{Request, Response};

#[async_trait]
pub trait TransportHandler: Send + Sync {
    async fn transp_request(&self, request: Request);
    async fn transp_response(&self, response: Response);
}

/// Default handler that only logs; useful for tests and for transports
/// created before their real owner is wired up.
pub struct LoggingHandler;

#[async_trait]
impl TransportHandler for LoggingHandler {
    async fn transp_request(&self, request: Request) {
        tracing::debug!(method = %request.method, "unhandled inbound request");
    }

    async fn transp_response(&self, response: Response) {
        tracing::debug!(status = %response.status, "unhandled inbound response");
    }
}
