#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use sipua_dialog_core::prelude::*;
use sipua_dialog_core::transaction::generate_branch;
use sipua_sip_core::{Message, Request, Response};
use sipua_sip_transport::{Interface, Transport, fill_via};

pub const PEER: &str = "192.0.2.1:5061";

/// A message handed to the mock transport
#[derive(Debug, Clone)]
pub struct Sent {
    pub message: Message,
    pub host: String,
    pub port: u16,
}

/// Transport that records what it is asked to send
#[derive(Debug)]
pub struct MockTransport {
    interface: Interface,
    sent: Mutex<Vec<Sent>>,
    closed: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        MockTransport {
            interface: Interface::new("192.0.2.4", 5060, "UDP"),
            sent: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<Request> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent.message {
                Message::Request(request) => Some(request),
                Message::Response(_) => None,
            })
            .collect()
    }

    pub fn responses(&self) -> Vec<Response> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent.message {
                Message::Response(response) => Some(response),
                Message::Request(_) => None,
            })
            .collect()
    }

    /// Waits until at least `count` messages were sent
    pub async fn wait_for(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while self.sent.lock().unwrap().len() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("messages were not sent in time");
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn interface(&self) -> Interface {
        self.interface.clone()
    }

    async fn send_message(&self, mut message: Message, host: &str, port: u16) -> sipua_sip_transport::Result<()> {
        if self.is_closed() {
            return Err(sipua_sip_transport::Error::TransportClosed);
        }
        fill_via(&mut message, &self.interface);
        self.sent.lock().unwrap().push(Sent {
            message,
            host: host.to_string(),
            port,
        });
        Ok(())
    }

    async fn close(&self) -> sipua_sip_transport::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("sipua_dialog_core=debug")
        .with_test_writer()
        .try_init();
}

pub fn user_agent(config: UaConfig) -> (UserAgent, Arc<MockTransport>) {
    init_logging();
    let transport = Arc::new(MockTransport::new());
    let ua = UserAgent::new(config, transport.clone(), Arc::new(MemoryStorage::new()));
    (ua, transport)
}

pub fn parse_request(text: &str) -> Request {
    match Message::parse(text.as_bytes()).unwrap() {
        Message::Request(request) => request,
        Message::Response(_) => panic!("expected a request"),
    }
}

/// A request from alice@atlanta.com to bob, inside a dialog when `to_tag`
/// is given
pub fn request(method: &str, call_id: &str, to_tag: Option<&str>, cseq: u32) -> Request {
    let to_tag = to_tag.map(|tag| format!(";tag={}", tag)).unwrap_or_default();
    parse_request(&format!(
        "{method} sip:bob@192.0.2.4 SIP/2.0\r\n\
         Via: SIP/2.0/UDP {PEER};branch={branch}\r\n\
         Max-Forwards: 70\r\n\
         To: Bob <sip:bob@biloxi.com>{to_tag}\r\n\
         From: Alice <sip:alice@atlanta.com>;tag=1928301774\r\n\
         Call-ID: {call_id}\r\n\
         CSeq: {cseq} {method}\r\n\
         Contact: <sip:alice@{PEER}>\r\n\r\n",
        branch = generate_branch(),
    ))
}

pub fn incoming(request: Request) -> IncomingRequest {
    let source: SocketAddr = PEER.parse().unwrap();
    IncomingRequest::new(request, source, Interface::new("192.0.2.4", 5060, "UDP"))
}

/// Answers with a fixed status code
pub struct Reply(pub u16);

#[async_trait]
impl RequestHandler for Reply {
    async fn handle(&self, ua: &UserAgent, request: &IncomingRequest) -> HandlerResult {
        ua.respond(request, request.create_response(self.0, None)).await?;
        Ok(())
    }
}

/// Records the requests it sees and answers 200
#[derive(Default)]
pub struct Recorder {
    pub seen: Mutex<Vec<IncomingRequest>>,
}

#[async_trait]
impl RequestHandler for Recorder {
    async fn handle(&self, ua: &UserAgent, request: &IncomingRequest) -> HandlerResult {
        self.seen.lock().unwrap().push(request.clone());
        ua.respond(request, request.create_response(200, None)).await?;
        Ok(())
    }
}
