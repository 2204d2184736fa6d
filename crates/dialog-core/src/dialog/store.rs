use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use super::dialog_id::DialogId;
use super::dialog_impl::{Dialog, FIELD_LOCAL_CSEQ, FIELD_REMOTE_CSEQ};
use crate::errors::{DialogResult, StorageError};
use crate::storage::Storage;

/// Dialog persistence on top of a [`Storage`] backend.
///
/// Besides reading and writing dialogs it hands out one async lock per
/// dialog id, so multi-step sequences (match, then advance or recreate)
/// on the same dialog run one at a time while other dialogs proceed.
pub struct DialogStore {
    storage: Arc<dyn Storage>,
    locks: DashMap<DialogId, Arc<Mutex<()>>>,
}

impl DialogStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            locks: DashMap::new(),
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Writes every field of `dialog`
    pub async fn put(&self, dialog: &Dialog) -> DialogResult<()> {
        self.storage
            .hset_many(&dialog.id.storage_key(), dialog.to_fields())
            .await?;
        debug!("Stored dialog {}", dialog.id);
        Ok(())
    }

    /// Loads a dialog; `None` when nothing is stored under `id`
    pub async fn get(&self, id: &DialogId) -> DialogResult<Option<Dialog>> {
        match self.storage.hget_all(&id.storage_key()).await {
            Ok(fields) => Ok(Some(Dialog::from_fields(&fields)?)),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn remove(&self, id: &DialogId) -> DialogResult<()> {
        self.storage.hdrop(&id.storage_key()).await?;
        debug!("Removed dialog {}", id);
        Ok(())
    }

    /// Advances the local CSeq and returns the new value
    pub async fn incr_local_cseq(&self, id: &DialogId) -> DialogResult<u32> {
        self.incr(id, FIELD_LOCAL_CSEQ).await
    }

    /// Advances the remote CSeq and returns the new value
    pub async fn incr_remote_cseq(&self, id: &DialogId) -> DialogResult<u32> {
        self.incr(id, FIELD_REMOTE_CSEQ).await
    }

    async fn incr(&self, id: &DialogId, field: &str) -> DialogResult<u32> {
        let value = self.storage.hincr(&id.storage_key(), field, 1).await?;
        let value = u32::try_from(value).map_err(|_| StorageError::InvalidValue {
            key: format!("{}.{}", id, field),
            reason: format!("{} is out of CSeq range", value),
        })?;
        Ok(value)
    }

    /// Waits for exclusive access to the dialog `id`.
    ///
    /// The lock entry exists only while someone holds or waits for it.
    pub async fn lock(&self, id: &DialogId) -> DialogGuard<'_> {
        let lock = self.locks.entry(id.clone()).or_default().value().clone();
        DialogGuard {
            guard: Some(lock.lock_owned().await),
            locks: &self.locks,
            id: id.clone(),
        }
    }

    /// Number of dialog locks currently held or waited for
    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }
}

/// Exclusive access to one dialog, released on drop
pub struct DialogGuard<'a> {
    guard: Option<OwnedMutexGuard<()>>,
    locks: &'a DashMap<DialogId, Arc<Mutex<()>>>,
    id: DialogId,
}

impl Drop for DialogGuard<'_> {
    fn drop(&mut self) {
        // unlock first so the map entry is the only remaining reference
        // when nobody waits
        drop(self.guard.take());
        self.locks
            .remove_if(&self.id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl std::fmt::Debug for DialogGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogGuard").field("id", &self.id).finish()
    }
}

impl std::fmt::Debug for DialogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogStore").field("locks", &self.locks.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use sipua_sip_core::Uri;

    fn dialog(id: DialogId) -> Dialog {
        Dialog {
            id,
            local_cseq: 0,
            remote_cseq: 10,
            local_uri: Uri::sip("biloxi.com").with_user("bob"),
            remote_uri: Uri::sip("atlanta.com").with_user("alice"),
            local_target: Uri::sip("192.0.2.4").with_port(5060),
            remote_target: Uri::sip("pc33.atlanta.com").with_user("alice"),
            route_set: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_put_get_remove() -> DialogResult<()> {
        let store = DialogStore::new(Arc::new(MemoryStorage::new()));
        let id = DialogId::new("call-1", "local", "remote");
        assert_eq!(store.get(&id).await?, None);

        store.put(&dialog(id.clone())).await?;
        assert_eq!(store.get(&id).await?, Some(dialog(id.clone())));

        assert_eq!(store.incr_remote_cseq(&id).await?, 11);
        assert_eq!(store.incr_local_cseq(&id).await?, 1);
        let stored = store.get(&id).await?.unwrap();
        assert_eq!((stored.local_cseq, stored.remote_cseq), (1, 11));

        store.remove(&id).await?;
        assert_eq!(store.get(&id).await?, None);
        assert!(store.remove(&id).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_ids_differing_in_remote_tag_are_distinct() -> DialogResult<()> {
        let store = DialogStore::new(Arc::new(MemoryStorage::new()));
        let a = DialogId::new("call-1", "local", "remote-a");
        let b = DialogId::new("call-1", "local", "remote-b");
        store.put(&dialog(a.clone())).await?;
        assert!(store.get(&a).await?.is_some());
        assert_eq!(store.get(&b).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_lock_serializes_same_dialog() {
        let store = Arc::new(DialogStore::new(Arc::new(MemoryStorage::new())));
        let id = DialogId::new("call-1", "local", "remote");
        let other = DialogId::new("call-2", "local", "remote");

        let guard = store.lock(&id).await;
        // a different dialog is not blocked
        let other_guard = store.lock(&other).await;

        let waiter = {
            let store = store.clone();
            let id = id.clone();
            tokio::spawn(async move {
                let _guard = store.lock(&id).await;
            })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
        drop(other_guard);
        assert_eq!(store.lock_count(), 0);
    }

    #[tokio::test]
    async fn test_lock_entry_survives_while_waited_for() {
        let store = Arc::new(DialogStore::new(Arc::new(MemoryStorage::new())));
        let id = DialogId::new("call-1", "local", "remote");

        let guard = store.lock(&id).await;
        let waiter = {
            let store = store.clone();
            let id = id.clone();
            tokio::spawn(async move {
                let _guard = store.lock(&id).await;
                store.lock_count()
            })
        };
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        drop(guard);
        assert_eq!(store.lock_count(), 1);
        // the waiter still holds the lock it was queued on
        assert_eq!(waiter.await.unwrap(), 1);
        assert_eq!(store.lock_count(), 0);
    }
}
