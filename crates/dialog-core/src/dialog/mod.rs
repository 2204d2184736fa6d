//! Core dialog types and functionality
//!
//! - [`DialogId`]: the (Call-ID, local tag, remote tag) identity of a dialog
//! - [`Dialog`]: dialog state as persisted in storage
//! - [`DialogStore`]: storage access and per-dialog locking through [`DialogGuard`]
//!
//! ## Matching
//!
//! ```text
//! inbound request ── To tag? ── no ──> dialog-initiating, no lookup
//!                        │
//!                       yes
//!                        │
//!         lookup (Call-ID, To tag, From tag)
//!            │                    │
//!          found               not found ──> no dialog attached
//!            │
//!   CSeq == remote + 1 ── yes ──> accept, advance remote CSeq
//!            │
//!            no ──> drop stale dialog, create a new one from the request
//! ```

pub mod dialog_id;
pub mod dialog_impl;
pub mod store;

pub use dialog_id::DialogId;
pub use dialog_impl::Dialog;
pub use store::{DialogGuard, DialogStore};
