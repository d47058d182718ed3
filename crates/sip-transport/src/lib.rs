//! UDP transport, Via rewriting, and request/response demultiplexing
//! (spec §4.C).

pub mod config;
pub mod error;
pub mod handler;
pub mod rewrite;
pub mod udp;

pub use config::TransportConfig;
pub use error::{Error, Result};
pub use handler::{LoggingHandler, TransportHandler};
pub use udp::UdpTransport;

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use sip_types::message::{Request, Response};

    use super::*;

    #[derive(Default)]
    struct CollectingHandler {
        requests: Mutex<Vec<Request>>,
    }

    #[async_trait]
    impl TransportHandler for CollectingHandler {
        async fn transp_request(&self, request: Request) {
            self.requests.lock().unwrap().push(request);
        }
        async fn transp_response(&self, _response: Response) {}
    }

    #[tokio::test]
    async fn ephemeral_port_is_assigned_and_at_least_1024() {
        let config = TransportConfig { listen_addr: "127.0.0.1".parse().unwrap(), ..Default::default() };
        let transport = UdpTransport::bind(config, Arc::new(LoggingHandler)).await.unwrap();
        assert!(transport.local_uri().port.unwrap() >= 1024);
    }

    #[tokio::test]
    async fn inbound_invite_gets_received_and_dispatched() {
        let server_config = TransportConfig { listen_addr: "127.0.0.1".parse().unwrap(), ..Default::default() };
        let handler = Arc::new(CollectingHandler::default());
        let server = UdpTransport::bind(server_config, handler.clone()).await.unwrap();
        let server_addr = server.local_addr();

        let client_config = TransportConfig { listen_addr: "127.0.0.1".parse().unwrap(), ..Default::default() };
        let client = UdpTransport::bind(client_config, Arc::new(LoggingHandler)).await.unwrap();

        let mut headers = sip_types::header::HeaderMap::new();
        headers.push(sip_types::header::Header::Via(sip_types::via::Via::new(
            "UDP",
            sip_types::uri::Host::Ipv4(client.local_addr().ip().to_string().parse().unwrap()),
            Some(client.local_addr().port()),
            vec![sip_types::param::Param::branch("z9hG4bK1"), sip_types::param::Param::flag("rport")],
        )));
        headers.push(sip_types::header::Header::From(
            sip_types::headers::NamedAddress::new(None, sip_types::uri::Uri::sip("a.com")).with_tag("1"),
        ));
        headers.push(sip_types::header::Header::To(sip_types::headers::NamedAddress::new(
            None,
            sip_types::uri::Uri::sip("b.com"),
        )));
        headers.push(sip_types::header::Header::CallId("call-1".into()));
        headers.push(sip_types::header::Header::CSeq(sip_types::headers::CSeq {
            seq: 1,
            method: sip_types::method::Method::Invite,
        }));
        let request = Request::new(sip_types::method::Method::Invite, sip_types::uri::Uri::sip("b.com"), headers);

        client.send_request(&request, Some(server_addr)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let received = handler.requests.lock().unwrap();
        assert_eq!(received.len(), 1);
        let via = received[0].top_via().unwrap();
        assert!(via.received().is_some());
        assert!(sip_types::param::find_value(&via.params, "rport").is_some());
    }
}
