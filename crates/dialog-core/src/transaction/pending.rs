use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use sipua_sip_core::Response;

use crate::errors::{DialogError, DialogResult};

struct PendingEntry {
    /// Registration the entry belongs to
    id: u64,
    tx: oneshot::Sender<Response>,
    /// Only a final (>= 200) response resolves the entry
    wait_final: bool,
}

/// Requests awaiting a response, keyed by Via branch
#[derive(Clone, Default)]
pub struct PendingResponses {
    entries: Arc<DashMap<String, PendingEntry>>,
    next_id: Arc<AtomicU64>,
}

impl PendingResponses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `branch` before its request is sent.
    ///
    /// The returned handle waits at most `timeout`; dropping it cancels the
    /// entry.
    pub fn register(&self, branch: impl Into<String>, wait_final: bool, timeout: Duration) -> PendingResponse {
        let branch = branch.into();
        let (tx, rx) = oneshot::channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if self
            .entries
            .insert(branch.clone(), PendingEntry { id, tx, wait_final })
            .is_some()
        {
            warn!("Replaced pending request with duplicate branch {}", branch);
        }
        trace!("Registered pending request {}", branch);
        PendingResponse {
            id,
            branch,
            rx,
            timeout,
            entries: self.entries.clone(),
        }
    }

    /// Hands `response` to the request waiting on its top Via branch.
    ///
    /// Returns `false` when no entry matches, or the entry waits for a final
    /// response and this one is provisional. An entry is removed and
    /// resolved exactly once.
    pub fn resolve(&self, response: &Response) -> bool {
        let Some(branch) = response.headers.top_via().and_then(|via| via.branch()) else {
            return false;
        };
        let is_final = response.is_final();
        match self
            .entries
            .remove_if(branch, |_, entry| is_final || !entry.wait_final)
        {
            Some((_, entry)) => {
                if entry.tx.send(response.clone()).is_err() {
                    debug!("Waiter for branch {} is gone", branch);
                }
                true
            }
            None => false,
        }
    }

    /// Drops the entry for `branch`; its waiter fails with `Cancelled`
    pub fn cancel(&self, branch: &str) -> bool {
        self.entries.remove(branch).is_some()
    }

    pub fn contains(&self, branch: &str) -> bool {
        self.entries.contains_key(branch)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for PendingResponses {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingResponses").field("len", &self.entries.len()).finish()
    }
}

/// Handle on the response to one outgoing request
#[derive(Debug)]
pub struct PendingResponse {
    id: u64,
    branch: String,
    rx: oneshot::Receiver<Response>,
    timeout: Duration,
    entries: Arc<DashMap<String, PendingEntry>>,
}

impl PendingResponse {
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Waits for the response, or fails with `Timeout` once the response
    /// timeout has elapsed. The pending entry is gone either way.
    pub async fn wait(mut self) -> DialogResult<Response> {
        match tokio::time::timeout(self.timeout, &mut self.rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(DialogError::Cancelled {
                branch: self.branch.clone(),
            }),
            Err(_) => {
                self.release();
                // a response may have slipped in between expiry and removal
                if let Ok(response) = self.rx.try_recv() {
                    return Ok(response);
                }
                debug!("Request {} timed out after {:?}", self.branch, self.timeout);
                Err(DialogError::Timeout {
                    branch: self.branch.clone(),
                    timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                })
            }
        }
    }
}

impl PendingResponse {
    /// Removes the entry unless the branch was registered again since
    fn release(&self) {
        self.entries.remove_if(&self.branch, |_, entry| entry.id == self.id);
    }
}

impl Drop for PendingResponse {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for PendingEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingEntry")
            .field("id", &self.id)
            .field("wait_final", &self.wait_final)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sipua_sip_core::ViaHeader;

    fn response(code: u16, branch: &str) -> Response {
        let mut response = Response::new(code, None);
        response
            .headers
            .append("via", ViaHeader::new("UDP", "192.0.2.4", Some(5060)).with_branch(branch));
        response
    }

    #[tokio::test]
    async fn test_first_response_resolves() {
        let pending = PendingResponses::new();
        let handle = pending.register("z9hG4bKaaa", false, Duration::from_secs(1));

        assert!(pending.resolve(&response(100, "z9hG4bKaaa")));
        assert!(!pending.resolve(&response(200, "z9hG4bKaaa")));
        assert_eq!(handle.wait().await.unwrap().code, 100);
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_wait_final_skips_provisionals() {
        let pending = PendingResponses::new();
        let handle = pending.register("z9hG4bKbbb", true, Duration::from_secs(1));

        assert!(!pending.resolve(&response(180, "z9hG4bKbbb")));
        assert!(pending.contains("z9hG4bKbbb"));
        assert!(pending.resolve(&response(486, "z9hG4bKbbb")));
        assert!(!pending.resolve(&response(200, "z9hG4bKbbb")));
        assert_eq!(handle.wait().await.unwrap().code, 486);
    }

    #[tokio::test]
    async fn test_unknown_branch_is_ignored() {
        let pending = PendingResponses::new();
        assert!(!pending.resolve(&response(200, "z9hG4bKnobody")));
        assert!(!pending.resolve(&Response::new(200, None)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_removes_entry() {
        let pending = PendingResponses::new();
        let handle = pending.register("z9hG4bKccc", true, Duration::from_secs(32));

        let err = handle.wait().await.unwrap_err();
        assert!(matches!(err, DialogError::Timeout { timeout_ms: 32_000, .. }));
        assert!(pending.is_empty());
        assert!(!pending.resolve(&response(200, "z9hG4bKccc")));
    }

    #[tokio::test]
    async fn test_drop_and_cancel() {
        let pending = PendingResponses::new();
        drop(pending.register("z9hG4bKddd", true, Duration::from_secs(1)));
        assert!(pending.is_empty());

        let handle = pending.register("z9hG4bKeee", true, Duration::from_secs(1));
        assert!(pending.cancel("z9hG4bKeee"));
        assert!(matches!(handle.wait().await, Err(DialogError::Cancelled { .. })));
    }

    #[tokio::test]
    async fn test_stale_handle_keeps_newer_registration() {
        let pending = PendingResponses::new();
        let stale = pending.register("z9hG4bKfff", true, Duration::from_secs(1));
        let current = pending.register("z9hG4bKfff", true, Duration::from_secs(1));

        drop(stale);
        assert!(pending.contains("z9hG4bKfff"));
        assert!(pending.resolve(&response(200, "z9hG4bKfff")));
        assert_eq!(current.wait().await.unwrap().code, 200);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_timeout_keeps_newer_registration() {
        let pending = PendingResponses::new();
        let stale = pending.register("z9hG4bKggg", true, Duration::from_secs(1));
        let _current = pending.register("z9hG4bKggg", true, Duration::from_secs(60));

        // the replaced waiter's sender is gone
        assert!(matches!(stale.wait().await, Err(DialogError::Cancelled { .. })));
        assert!(pending.contains("z9hG4bKggg"));
    }
}
