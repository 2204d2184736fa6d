//! # sipua-dialog-core
//!
//! Dialog and transaction state of the sipua stack: dialog identity,
//! matching and recovery, response correlation by Via branch, and the
//! [`UserAgent`](ua::UserAgent) that dispatches inbound requests to
//! per-method handlers.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use sipua_dialog_core::prelude::*;
//! use sipua_sip_core::Method;
//!
//! struct Options;
//!
//! #[async_trait]
//! impl RequestHandler for Options {
//!     async fn handle(&self, ua: &UserAgent, request: &IncomingRequest) -> HandlerResult {
//!         ua.respond(request, request.create_response(200, None)).await?;
//!         Ok(())
//!     }
//! }
//!
//! # async fn run() -> anyhow::Result<()> {
//! let (transport, events) = sipua_sip_transport::bind_udp("0.0.0.0:5060".parse()?).await?;
//! let ua = UserAgent::new(UaConfig::default(), Arc::new(transport), Arc::new(MemoryStorage::new()));
//! ua.register_handler(Method::Options, Arc::new(Options));
//! ua.run(events).await;
//! # Ok(())
//! # }
//! ```

pub mod dialog;
pub mod errors;
pub mod storage;
pub mod transaction;
pub mod ua;

pub use dialog::{Dialog, DialogId, DialogStore};
pub use errors::{DialogError, DialogResult};
pub use storage::{MemoryStorage, Storage, StorageError, StorageResult};
pub use transaction::{PendingResponse, PendingResponses, generate_branch};
pub use ua::{HandlerError, HandlerResult, IncomingRequest, RequestHandler, TransactionContext, UaConfig, UserAgent};

/// Re-exports of the commonly used types
pub mod prelude {
    pub use crate::dialog::{Dialog, DialogId, DialogStore};
    pub use crate::errors::{DialogError, DialogResult};
    pub use crate::storage::{MemoryStorage, Storage, StorageError};
    pub use crate::transaction::{PendingResponse, PendingResponses};
    pub use crate::ua::{HandlerError, HandlerResult, IncomingRequest, RequestHandler, TransactionContext, UaConfig, UserAgent};
}
