//! User agent
//!
//! [`UserAgent`] ties the transport, dialog store and response correlation
//! together:
//!
//! ```text
//!   TransportEvent ──► message_received
//!                        ├─ Request ──► validate ─► match_dialog ─► RequestHandler
//!                        └─ Response ─► PendingResponses::resolve
//!
//!   send_request ──► branch, CSeq, defaults ─► register ─► Transport
//! ```

mod config;
mod handler;
mod user_agent;

pub use config::{DEFAULT_MAX_FORWARDS, DEFAULT_RESPONSE_TIMEOUT, DEFAULT_SIP_PORT, T1, UaConfig};
pub use handler::{
    HandlerError, HandlerResult, IncomingRequest, MethodNotAllowed, RequestHandler, TransactionContext,
};
pub use user_agent::UserAgent;
