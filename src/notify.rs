//! Notification registry: scope key -> re-fetch callback.
//!
//! Each store owns one registry. A mutation on a collection fires every callback whose key
//! starts with the collection name, whatever its scope; callbacks re-query their own scope,
//! so over-notification costs work but never correctness.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::storage::Collection;

/// Callback fired when a matching collection changes.
pub type Callback = Arc<dyn Fn() + Send + Sync>;

/// Identifies one registration; unique for the life of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Entry {
    key: String,
    callback: Callback,
}

pub struct NotificationRegistry {
    listeners: RwLock<HashMap<ListenerId, Entry>>,
    next_id: AtomicU64,
}

impl Default for NotificationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationRegistry {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register `callback` under a scope key such as `files_<user>_<subject>`.
    /// Several registrations may share a key.
    pub fn register(&self, key: impl Into<String>, callback: Callback) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let key = key.into();
        tracing::trace!(key = %key, listener = id.0, "Registered listener");

        self.listeners.write().insert(id, Entry { key, callback });
        id
    }

    /// Remove a registration. Returns false if it was already gone.
    pub fn unregister(&self, id: ListenerId) -> bool {
        self.listeners.write().remove(&id).is_some()
    }

    /// Fire every callback whose key starts with the collection name.
    ///
    /// Callbacks run after the lock is released, so they may register, unregister or
    /// mutate the store themselves.
    pub fn notify(&self, collection: Collection) {
        let prefix = collection.name();
        let callbacks: Vec<Callback> = self
            .listeners
            .read()
            .values()
            .filter(|entry| entry.key.starts_with(prefix))
            .map(|entry| Arc::clone(&entry.callback))
            .collect();

        tracing::trace!(collection = %collection, listeners = callbacks.len(), "Notifying");
        for callback in callbacks {
            callback();
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Registrations whose key starts with `prefix`.
    pub fn count_matching(&self, prefix: &str) -> usize {
        self.listeners
            .read()
            .values()
            .filter(|entry| entry.key.starts_with(prefix))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, Callback) {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_cb = Arc::clone(&hits);
        (
            hits,
            Arc::new(move || {
                hits_cb.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    #[test]
    fn test_notify_fires_every_scope_of_collection() {
        let registry = NotificationRegistry::new();
        let (per_subject, cb1) = counter();
        let (all_files, cb2) = counter();
        let (subjects, cb3) = counter();
        registry.register("files_u1_s1", cb1);
        registry.register("files_u2_all", cb2);
        registry.register("subjects_u1", cb3);

        registry.notify(Collection::Files);

        assert_eq!(per_subject.load(Ordering::SeqCst), 1);
        assert_eq!(all_files.load(Ordering::SeqCst), 1);
        assert_eq!(subjects.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_same_key_registrations_do_not_overwrite() {
        let registry = NotificationRegistry::new();
        let (first, cb1) = counter();
        let (second, cb2) = counter();
        let id1 = registry.register("subjects_u1", cb1);
        registry.register("subjects_u1", cb2);

        assert!(registry.unregister(id1));
        registry.notify(Collection::Subjects);

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister_twice() {
        let registry = NotificationRegistry::new();
        let (_, cb) = counter();
        let id = registry.register("files_u1_all", cb);

        assert!(registry.unregister(id));
        assert!(!registry.unregister(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_callback_may_unregister_itself() {
        let registry = Arc::new(NotificationRegistry::new());
        let slot: Arc<parking_lot::Mutex<Option<ListenerId>>> = Arc::default();

        let registry_cb = Arc::clone(&registry);
        let slot_cb = Arc::clone(&slot);
        let id = registry.register(
            "blobs_any",
            Arc::new(move || {
                if let Some(id) = *slot_cb.lock() {
                    registry_cb.unregister(id);
                }
            }),
        );
        *slot.lock() = Some(id);

        registry.notify(Collection::Blobs);
        assert!(registry.is_empty());
    }
}
