use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use sipua_sip_core::token::generate_tag;
use sipua_sip_core::{Method, Request, Response};
use sipua_sip_transport::Interface;

use super::UserAgent;
use crate::dialog::Dialog;
use crate::errors::{DialogError, DialogResult};

/// Outcome of a [`RequestHandler`]
pub type HandlerResult = Result<(), HandlerError>;

/// How a request handler failed
#[derive(Error, Debug)]
pub enum HandlerError {
    /// Answer the request with this status
    #[error("{code} {reason}")]
    Status { code: u16, reason: String },

    /// Unexpected failure; the request is answered with 500
    #[error(transparent)]
    Fault(#[from] anyhow::Error),
}

impl HandlerError {
    pub fn status(code: u16, reason: impl Into<String>) -> Self {
        HandlerError::Status {
            code,
            reason: reason.into(),
        }
    }
}

impl From<DialogError> for HandlerError {
    fn from(error: DialogError) -> Self {
        match error {
            DialogError::Protocol { code, reason } => HandlerError::Status { code, reason },
            other => HandlerError::Fault(anyhow::Error::new(other)),
        }
    }
}

/// Application logic for one request method
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, ua: &UserAgent, request: &IncomingRequest) -> HandlerResult;
}

/// Server transaction a request arrived on.
///
/// When present, responses go through it instead of straight to the
/// transport.
#[async_trait]
pub trait TransactionContext: Send + Sync + fmt::Debug {
    async fn send_response(&self, response: Response) -> DialogResult<()>;
}

/// Answers every request with 405
#[derive(Debug, Default)]
pub struct MethodNotAllowed;

#[async_trait]
impl RequestHandler for MethodNotAllowed {
    async fn handle(&self, _ua: &UserAgent, _request: &IncomingRequest) -> HandlerResult {
        Err(HandlerError::status(405, "Method Not Allowed"))
    }
}

/// An inbound request together with where it came from and the dialog it
/// belongs to
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    pub request: Request,
    pub source: SocketAddr,
    pub interface: Interface,
    /// The dialog the request was matched to, if any
    pub dialog: Option<Dialog>,
    /// To tag this UA answers with
    pub to_tag: String,
    pub transaction: Option<Arc<dyn TransactionContext>>,
}

impl IncomingRequest {
    pub fn new(request: Request, source: SocketAddr, interface: Interface) -> Self {
        let to_tag = request
            .headers
            .address("to")
            .and_then(|to| to.tag())
            .map(str::to_string)
            .unwrap_or_else(generate_tag);
        IncomingRequest {
            request,
            source,
            interface,
            dialog: None,
            to_tag,
            transaction: None,
        }
    }

    pub fn with_transaction(mut self, transaction: Arc<dyn TransactionContext>) -> Self {
        self.transaction = Some(transaction);
        self
    }

    pub fn method(&self) -> &Method {
        &self.request.method
    }

    /// Builds a response to this request.
    ///
    /// Every response except 100 carries [`IncomingRequest::to_tag`] in its
    /// To header, so all responses of one request share a tag.
    pub fn create_response(&self, code: u16, reason: Option<&str>) -> Response {
        let mut response = self.request.create_response(code, reason);
        if code != 100 {
            if let Some(to) = response.headers.address_mut("to") {
                if to.tag().is_none() {
                    to.set_tag(self.to_tag.clone());
                }
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sipua_sip_core::Message;

    fn incoming(to: &str) -> IncomingRequest {
        let text = format!(
            "OPTIONS sip:bob@biloxi.com SIP/2.0\r\n\
             Via: SIP/2.0/UDP pc33.atlanta.com;branch=z9hG4bK776asdhds\r\n\
             To: {}\r\n\
             From: <sip:alice@atlanta.com>;tag=1928301774\r\n\
             Call-ID: a84b4c76e66710\r\n\
             CSeq: 1 OPTIONS\r\n\r\n",
            to
        );
        let Message::Request(request) = Message::parse(text.as_bytes()).unwrap() else {
            panic!("expected a request");
        };
        IncomingRequest::new(request, "192.0.2.1:5060".parse().unwrap(), Interface::new("192.0.2.4", 5060, "UDP"))
    }

    #[test]
    fn test_response_gets_generated_tag() {
        let request = incoming("<sip:bob@biloxi.com>");
        assert_eq!(request.to_tag.len(), 7);

        let ok = request.create_response(200, None);
        let trying = request.create_response(100, None);
        assert_eq!(ok.headers.address("to").and_then(|to| to.tag()), Some(request.to_tag.as_str()));
        assert_eq!(trying.headers.address("to").and_then(|to| to.tag()), None);
        // the same tag on every response
        let ringing = request.create_response(180, None);
        assert_eq!(ringing.headers.address("to").and_then(|to| to.tag()), Some(request.to_tag.as_str()));
    }

    #[test]
    fn test_existing_to_tag_is_kept() {
        let request = incoming("<sip:bob@biloxi.com>;tag=a6c85cf");
        assert_eq!(request.to_tag, "a6c85cf");
        let ok = request.create_response(200, None);
        assert_eq!(ok.headers.address("to").and_then(|to| to.tag()), Some("a6c85cf"));
    }

    #[test]
    fn test_dialog_error_conversion() {
        let status: HandlerError = DialogError::protocol(481, "Call Does Not Exist").into();
        assert!(matches!(status, HandlerError::Status { code: 481, .. }));

        let fault: HandlerError = DialogError::Routing("no route".into()).into();
        assert!(matches!(fault, HandlerError::Fault(_)));
    }
}
