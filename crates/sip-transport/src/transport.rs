use std::fmt;
use std::net::SocketAddr;

use async_trait::async_trait;
use sipua_sip_core::{Message, Uri};

use crate::error::Result;

/// The address and protocol a transport listens on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Interface {
    pub host: String,
    pub port: u16,
    /// Transport token as it appears in a Via (`UDP`, `TCP`, ...)
    pub transport: String,
}

impl Interface {
    pub fn new(host: impl Into<String>, port: u16, transport: impl Into<String>) -> Self {
        Interface {
            host: host.into(),
            port,
            transport: transport.into(),
        }
    }

    /// `sip:<host>:<port>;transport=<transport>`
    pub fn sip_uri(&self) -> Uri {
        Uri::sip(self.host.clone())
            .with_port(self.port)
            .with_param("transport", Some(&self.transport))
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:{}", self.transport, self.host, self.port)
    }
}

/// Events emitted by a transport
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A complete SIP message was received
    MessageReceived {
        message: Message,
        source: SocketAddr,
        /// Interface the message arrived on
        interface: Interface,
    },

    /// A datagram could not be received or decoded
    Error {
        error: String,
    },

    /// The transport was closed
    Closed,
}

/// A SIP transport
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// The interface this transport listens on
    fn interface(&self) -> Interface;

    /// Sends a message to `host:port`.
    ///
    /// An unfilled top Via on a request is completed from [`Transport::interface`]
    /// before the message is encoded.
    async fn send_message(&self, message: Message, host: &str, port: u16) -> Result<()>;

    /// Stops receiving and rejects further sends
    async fn close(&self) -> Result<()>;

    fn is_closed(&self) -> bool;
}

/// Completes an unfilled top Via of a request from `interface`.
pub fn fill_via(message: &mut Message, interface: &Interface) {
    let Message::Request(request) = message else {
        return;
    };
    if let Some(via) = request.headers.top_via_mut() {
        if !via.is_filled() {
            via.fill(interface.transport.clone(), interface.host.clone(), interface.port);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sipua_sip_core::{Method, Request, Response, ViaHeader};

    #[test]
    fn test_interface_uri() {
        let interface = Interface::new("192.0.2.10", 5070, "UDP");
        assert_eq!(interface.sip_uri().to_string(), "sip:192.0.2.10:5070;transport=UDP");
    }

    #[test]
    fn test_fill_via_completes_unfilled_request_via() {
        let interface = Interface::new("10.0.0.1", 5060, "UDP");
        let mut request = Request::new(Method::Options, Uri::sip("example.com"));
        request.headers.append("via", ViaHeader::default().with_branch("z9hG4bKabc1234"));
        let mut message = Message::Request(request);

        fill_via(&mut message, &interface);

        let via = message.headers().top_via().unwrap();
        assert_eq!(via.to_string(), "SIP/2.0/UDP 10.0.0.1:5060;branch=z9hG4bKabc1234");
    }

    #[test]
    fn test_fill_via_leaves_filled_and_response_vias() {
        let interface = Interface::new("10.0.0.1", 5060, "UDP");
        let filled: ViaHeader = "SIP/2.0/TCP other.example.com;branch=z9hG4bK1".parse().unwrap();

        let mut request = Request::new(Method::Options, Uri::sip("example.com"));
        request.headers.append("via", filled.clone());
        let mut message = Message::Request(request);
        fill_via(&mut message, &interface);
        assert_eq!(message.headers().top_via(), Some(&filled));

        let mut response = Response::new(200, None);
        response.headers.append("via", ViaHeader::default());
        let mut message = Message::Response(response);
        fill_via(&mut message, &interface);
        assert!(!message.headers().top_via().unwrap().is_filled());
    }
}
