//! The SIP user agent
//!
//! ## Key Responsibilities
//!
//! - **Request Dispatch**: Validate inbound requests, match them to a dialog
//!   and hand them to the handler registered for their method
//! - **Dialog Matching**: Accept in-order requests and rebuild dialogs whose
//!   CSeq went out of step
//! - **Outgoing Requests**: Stamp branch, CSeq and defaults, pick the next
//!   hop and register for the response before sending
//! - **Response Correlation**: Deliver inbound responses to the request
//!   waiting on their Via branch

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use sipua_sip_core::{CSeqHeader, Message, Method, Request, Response, Uri, ViaHeader};
use sipua_sip_transport::{Interface, Transport, TransportEvent};

use super::config::UaConfig;
use super::handler::{HandlerError, IncomingRequest, MethodNotAllowed, RequestHandler, TransactionContext};
use crate::dialog::{Dialog, DialogId, DialogStore};
use crate::errors::{DialogError, DialogResult};
use crate::storage::Storage;
use crate::transaction::{PendingResponse, PendingResponses, generate_branch};

struct UserAgentInner {
    config: UaConfig,
    transport: Arc<dyn Transport>,
    dialogs: DialogStore,
    pending: PendingResponses,
    handlers: DashMap<Method, Arc<dyn RequestHandler>>,
    default_handler: Arc<dyn RequestHandler>,
    recovered_dialogs: AtomicU64,
}

/// A SIP user agent on top of one transport.
///
/// Cheap to clone; clones share dialogs, handlers and pending requests.
#[derive(Clone)]
pub struct UserAgent {
    inner: Arc<UserAgentInner>,
}

impl UserAgent {
    pub fn new(config: UaConfig, transport: Arc<dyn Transport>, storage: Arc<dyn Storage>) -> Self {
        UserAgent {
            inner: Arc::new(UserAgentInner {
                config,
                transport,
                dialogs: DialogStore::new(storage),
                pending: PendingResponses::new(),
                handlers: DashMap::new(),
                default_handler: Arc::new(MethodNotAllowed),
                recovered_dialogs: AtomicU64::new(0),
            }),
        }
    }

    /// Routes requests of `method` to `handler`, replacing any earlier one
    pub fn register_handler(&self, method: Method, handler: Arc<dyn RequestHandler>) {
        debug!("Registered handler for {}", method);
        self.inner.handlers.insert(method, handler);
    }

    pub fn config(&self) -> &UaConfig {
        &self.inner.config
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.inner.transport
    }

    pub fn dialogs(&self) -> &DialogStore {
        &self.inner.dialogs
    }

    pub fn pending(&self) -> &PendingResponses {
        &self.inner.pending
    }

    /// How many dialogs were rebuilt after a CSeq mismatch
    pub fn recovered_dialogs(&self) -> u64 {
        self.inner.recovered_dialogs.load(Ordering::Relaxed)
    }

    /// Consumes transport events until the transport closes.
    ///
    /// Each message is processed on its own task; failures are logged.
    pub async fn run(self, mut events: mpsc::Receiver<TransportEvent>) {
        info!("User agent listening on {}", self.inner.transport.interface());
        while let Some(event) = events.recv().await {
            match event {
                TransportEvent::MessageReceived {
                    message,
                    source,
                    interface,
                } => {
                    let ua = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = ua.message_received(message, source, interface).await {
                            error!("Error processing message from {}: {}", source, e);
                        }
                    });
                }
                TransportEvent::Error { error } => {
                    warn!("Transport error: {}", error);
                }
                TransportEvent::Closed => {
                    info!("Transport closed");
                    break;
                }
            }
        }
    }

    /// Entry point for every decoded inbound message
    pub async fn message_received(&self, message: Message, source: SocketAddr, interface: Interface) -> DialogResult<()> {
        match message {
            Message::Request(request) => {
                self.request_received(IncomingRequest::new(request, source, interface))
                    .await
            }
            Message::Response(response) => self.response_received(response),
        }
    }

    /// Validates, matches and dispatches an inbound request.
    ///
    /// Invalid requests get a 400. A dialog lookup that fails for any
    /// reason other than [`DialogError::Protocol`] is answered with 500 and
    /// its error returned. A handler returning [`HandlerError::Status`] has
    /// that status sent; a handler fault is answered with 500 and returned
    /// as [`DialogError::Internal`].
    pub async fn request_received(&self, mut incoming: IncomingRequest) -> DialogResult<()> {
        debug!(
            "Received {} request from {} on {}",
            incoming.request.method, incoming.source, incoming.interface
        );

        if let Err(e) = incoming.request.validate() {
            warn!("Rejecting {} request from {}: {}", incoming.request.method, incoming.source, e);
            return self.reply(&incoming, 400, None).await;
        }

        incoming.dialog = match self.match_dialog(&incoming).await {
            Ok(dialog) => dialog,
            Err(DialogError::Protocol { code, reason }) => {
                return self.reply(&incoming, code, Some(&reason)).await;
            }
            Err(e) => {
                error!(
                    "Dialog lookup for {} request from {} failed: {}",
                    incoming.request.method, incoming.source, e
                );
                if let Err(send) = self.reply(&incoming, 500, None).await {
                    warn!("Failed to send 500 response: {}", send);
                }
                return Err(e);
            }
        };

        let handler = self
            .inner
            .handlers
            .get(&incoming.request.method)
            .map(|entry| entry.value().clone())
            .unwrap_or_else(|| self.inner.default_handler.clone());

        match handler.handle(self, &incoming).await {
            Ok(()) => Ok(()),
            Err(HandlerError::Status { code, reason }) => self.reply(&incoming, code, Some(&reason)).await,
            Err(HandlerError::Fault(fault)) => {
                error!(
                    "Handler for {} request from {} failed: {:#}",
                    incoming.request.method, incoming.source, fault
                );
                if let Err(e) = self.reply(&incoming, 500, None).await {
                    warn!("Failed to send 500 response: {}", e);
                }
                Err(DialogError::Internal(fault))
            }
        }
    }

    /// Finds the dialog an inbound request belongs to.
    ///
    /// A request whose CSeq is exactly one past the stored remote CSeq
    /// advances the dialog. Any other CSeq replaces the stored dialog with
    /// one built from this request.
    pub async fn match_dialog(&self, incoming: &IncomingRequest) -> DialogResult<Option<Dialog>> {
        let Some(id) = DialogId::from_request(&incoming.request)? else {
            return Ok(None);
        };

        let dialogs = &self.inner.dialogs;
        let _guard = dialogs.lock(&id).await;

        let Some(mut dialog) = dialogs.get(&id).await? else {
            debug!("No dialog {} for {} request", id, incoming.request.method);
            return Ok(None);
        };

        let cseq = incoming
            .request
            .headers
            .cseq()
            .ok_or(DialogError::MissingHeader("CSeq"))?
            .number;

        if dialog.remote_cseq.checked_add(1) == Some(cseq) {
            dialog.remote_cseq = dialogs.incr_remote_cseq(&id).await?;
            return Ok(Some(dialog));
        }

        warn!(
            "CSeq {} out of order in dialog {} (last {}), recreating dialog",
            cseq, id, dialog.remote_cseq
        );
        let replacement = Dialog::from_request(&incoming.request, &id.local_tag, &incoming.interface)?;
        dialogs.remove(&id).await?;
        dialogs.put(&replacement).await?;
        self.inner.recovered_dialogs.fetch_add(1, Ordering::Relaxed);
        Ok(Some(replacement))
    }

    /// Creates and stores the dialog established by `incoming`, using its
    /// To tag as the local tag
    pub async fn create_dialog(&self, incoming: &IncomingRequest) -> DialogResult<Dialog> {
        let dialog = Dialog::from_request(&incoming.request, &incoming.to_tag, &incoming.interface)?;
        self.inner.dialogs.put(&dialog).await?;
        info!("Created dialog {}", dialog.id);
        Ok(dialog)
    }

    pub async fn get_dialog(&self, id: &DialogId) -> DialogResult<Option<Dialog>> {
        self.inner.dialogs.get(id).await
    }

    /// Deletes a dialog
    pub async fn remove_dialog(&self, id: &DialogId) -> DialogResult<()> {
        self.inner.dialogs.remove(id).await?;
        info!("Removed dialog {}", id);
        Ok(())
    }

    /// Sends a request and returns a handle on its response.
    ///
    /// The top Via gets a fresh branch (a new unfilled Via is added when
    /// there is none). Within `dialog` the local CSeq is advanced and
    /// written to the CSeq header. The request goes to the first Route when
    /// present, otherwise to the request URI.
    ///
    /// With `wait_final` provisional responses are skipped.
    pub async fn send_request(
        &self,
        mut request: Request,
        dialog: Option<&DialogId>,
        wait_final: bool,
    ) -> DialogResult<PendingResponse> {
        let config = &self.inner.config;

        let branch = generate_branch();
        match request.headers.top_via_mut() {
            Some(via) => via.set_branch(branch.clone()),
            None => request
                .headers
                .prepend("via", ViaHeader::default().with_branch(branch.clone())),
        }

        let (host, port) = self.next_hop(&request)?;

        if let Some(id) = dialog {
            let cseq = self.inner.dialogs.incr_local_cseq(id).await?;
            match request.headers.cseq_mut() {
                Some(header) => header.number = cseq,
                None => request
                    .headers
                    .insert("cseq", CSeqHeader::new(cseq, request.method.clone())),
            }
        }

        if !request.headers.contains("max-forwards") {
            request.headers.insert("max-forwards", config.max_forwards.to_string());
        }
        if let Some(user_agent) = &config.user_agent {
            if !request.headers.contains("user-agent") {
                request.headers.insert("user-agent", user_agent.as_str());
            }
        }
        request.headers.set_compact(config.compact_headers);

        let method = request.method.clone();
        let pending = self
            .inner
            .pending
            .register(branch, wait_final, config.response_timeout);

        debug!("Sending {} request to {}:{} ({})", method, host, port, pending.branch());
        self.inner
            .transport
            .send_message(Message::Request(request), &host, port)
            .await?;
        Ok(pending)
    }

    /// [`UserAgent::send_request`] followed by waiting for the response
    pub async fn send_request_and_wait(
        &self,
        request: Request,
        dialog: Option<&DialogId>,
        wait_final: bool,
    ) -> DialogResult<Response> {
        self.send_request(request, dialog, wait_final).await?.wait().await
    }

    /// Sends a response through `transaction`, or to the sent-by of its top
    /// Via when there is none
    pub async fn send_response(
        &self,
        mut response: Response,
        transaction: Option<&Arc<dyn TransactionContext>>,
    ) -> DialogResult<()> {
        let config = &self.inner.config;
        if let Some(server) = &config.user_agent {
            if !response.headers.contains("server") {
                response.headers.insert("server", server.as_str());
            }
        }
        response.headers.set_compact(config.compact_headers);

        if let Some(transaction) = transaction {
            return transaction.send_response(response).await;
        }

        let via = response.headers.top_via().ok_or(DialogError::MissingHeader("Via"))?;
        let (host, port) = via
            .sent_by()
            .ok_or_else(|| DialogError::Routing("top Via has no sent-by".to_string()))?;
        let (host, port) = (host.to_string(), port.unwrap_or(config.default_port));

        debug!("Sending {} response to {}:{}", response.code, host, port);
        self.inner
            .transport
            .send_message(Message::Response(response), &host, port)
            .await?;
        Ok(())
    }

    /// Sends `response` back on the transaction `incoming` arrived on
    pub async fn respond(&self, incoming: &IncomingRequest, response: Response) -> DialogResult<()> {
        self.send_response(response, incoming.transaction.as_ref()).await
    }

    /// Hands a response to the request waiting on its branch; unmatched
    /// responses are dropped
    pub fn response_received(&self, response: Response) -> DialogResult<()> {
        if self.inner.pending.resolve(&response) {
            debug!("Delivered {} response", response.code);
        } else {
            debug!(
                "Dropping {} response for unknown branch {:?}",
                response.code,
                response.headers.top_via().and_then(|via| via.branch())
            );
        }
        Ok(())
    }

    async fn reply(&self, incoming: &IncomingRequest, code: u16, reason: Option<&str>) -> DialogResult<()> {
        let mut response = incoming.create_response(code, reason);
        if code == 405 {
            response.headers.insert("allow", self.allowed_methods());
        }
        match self.respond(incoming, response).await {
            Err(DialogError::MissingHeader("Via")) => {
                warn!(
                    "Cannot answer {} request from {} without a Via",
                    incoming.request.method, incoming.source
                );
                Ok(())
            }
            other => other,
        }
    }

    fn allowed_methods(&self) -> String {
        let mut methods: Vec<String> = self
            .inner
            .handlers
            .iter()
            .map(|entry| entry.key().to_string())
            .collect();
        methods.sort();
        methods.join(", ")
    }

    fn next_hop(&self, request: &Request) -> DialogResult<(String, u16)> {
        let target: &Uri = match request.headers.address("route") {
            Some(route) => &route.uri,
            None => &request.uri,
        };
        if !target.scheme.is_sip() {
            return Err(DialogError::Routing(format!("cannot route to {} URI {}", target.scheme, target)));
        }
        Ok((target.host.clone(), target.port.unwrap_or(self.inner.config.default_port)))
    }
}

impl std::fmt::Debug for UserAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserAgent")
            .field("config", &self.inner.config)
            .field("transport", &self.inner.transport)
            .field("dialogs", &self.inner.dialogs)
            .field("pending", &self.inner.pending)
            .field("handlers", &self.inner.handlers.len())
            .finish()
    }
}
