//! Error types for dialog-core
//!
//! [`DialogError`] is the error of every fallible operation in this crate.
//! Storage lookups fail with [`StorageError`], handlers fail with
//! [`HandlerError`](crate::ua::HandlerError).

use thiserror::Error;

pub use crate::storage::StorageError;

/// Result type for dialog operations
pub type DialogResult<T> = Result<T, DialogError>;

/// Errors raised while matching dialogs, correlating responses or running
/// the user agent
#[derive(Error, Debug)]
pub enum DialogError {
    /// Malformed or invalid SIP message
    #[error("SIP error: {0}")]
    Sip(#[from] sipua_sip_core::Error),

    /// Dialog storage lookup or decode failure
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The transport refused or failed to send
    #[error("Transport error: {0}")]
    Transport(#[from] sipua_sip_transport::Error),

    /// A request cannot be served; answered with `code` and `reason`
    #[error("Protocol error: {code} {reason}")]
    Protocol { code: u16, reason: String },

    /// A header needed for the operation is absent
    #[error("Missing header: {0}")]
    MissingHeader(&'static str),

    /// No destination can be derived for a message
    #[error("Routing error: {0}")]
    Routing(String),

    /// No matching response arrived in time
    #[error("No response for branch {branch} within {timeout_ms} ms")]
    Timeout { branch: String, timeout_ms: u64 },

    /// The pending request was cancelled before a response arrived
    #[error("Request with branch {branch} was cancelled")]
    Cancelled { branch: String },

    /// A request handler failed unexpectedly
    #[error("Internal error: {0}")]
    Internal(#[source] anyhow::Error),
}

impl DialogError {
    pub fn protocol(code: u16, reason: impl Into<String>) -> Self {
        DialogError::Protocol {
            code,
            reason: reason.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, DialogError::Timeout { .. })
    }
}
