//! Transaction correlation
//!
//! Outgoing requests get a fresh Via branch ([`generate_branch`]) and a
//! pending entry keyed by it ([`PendingResponses`]). Inbound responses are
//! matched on the branch of their top Via and resolve that entry exactly
//! once. Retransmission timers are not implemented here; every entry is
//! bounded by a response timeout instead.

pub mod branch;
pub mod pending;

pub use branch::{MAGIC_COOKIE, generate_branch, is_rfc3261_branch};
pub use pending::{PendingResponse, PendingResponses};
