//! Live queries over the store.
//!
//! A subscription is Active from the moment its re-fetch callback is registered until its
//! `Subscription` handle is unsubscribed or dropped. Every delivery is a full re-query of
//! the subscription's scope, so the last snapshot delivered after writes settle always
//! matches the store.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::notify::{ListenerId, NotificationRegistry};
use crate::storage::models::{FileMetadata, Subject};
use crate::storage::{Store, StoreError};

type UpdateFn<T> = Box<dyn Fn(Vec<T>) + Send + Sync>;
type ErrorFn = Box<dyn Fn(&StoreError) + Send + Sync>;

/// Receives snapshots, and optionally re-fetch failures, for one subscription.
pub struct Listener<T> {
    on_update: UpdateFn<T>,
    on_error: Option<ErrorFn>,
}

impl<T> Listener<T> {
    pub fn new(on_update: impl Fn(Vec<T>) + Send + Sync + 'static) -> Self {
        Self {
            on_update: Box::new(on_update),
            on_error: None,
        }
    }

    /// Route re-fetch failures here instead of the log.
    pub fn on_error(mut self, on_error: impl Fn(&StoreError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(on_error));
        self
    }
}

/// Handle to an active subscription. Unsubscribes on drop.
#[must_use = "dropping a Subscription unsubscribes it"]
pub struct Subscription {
    key: String,
    id: ListenerId,
    registry: Arc<NotificationRegistry>,
    alive: Arc<AtomicBool>,
}

impl Subscription {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_active(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Stop deliveries. Safe to call more than once.
    ///
    /// A re-fetch that has not yet finished its query will not deliver its result. A delivery
    /// already inside `on_update` on another thread is not interrupted and may complete after
    /// this returns.
    pub fn unsubscribe(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            self.registry.unregister(self.id);
            tracing::debug!(key = %self.key, "Unsubscribed");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("active", &self.is_active())
            .finish()
    }
}

type FetchFn<T> = Box<dyn Fn() -> Result<Vec<T>, StoreError> + Send + Sync>;

/// Re-fetch state for one subscription.
///
/// Runs are serialized by `gate` and coalesced by `dirty`: a notification that arrives while
/// a run is in progress (from another thread, or from inside `on_update`) only marks the
/// feed dirty and the running fetch loops once more.
struct Feed<T> {
    key: String,
    fetch: FetchFn<T>,
    listener: Listener<T>,
    alive: Arc<AtomicBool>,
    dirty: AtomicBool,
    gate: Mutex<()>,
}

impl<T> Feed<T> {
    fn refresh(&self) {
        self.dirty.store(true, Ordering::SeqCst);

        while self.alive.load(Ordering::SeqCst) {
            let Some(guard) = self.gate.try_lock() else {
                return;
            };
            while self.dirty.swap(false, Ordering::SeqCst) {
                self.run_once();
            }
            drop(guard);

            if !self.dirty.load(Ordering::SeqCst) {
                return;
            }
        }
    }

    fn run_once(&self) {
        let result = (self.fetch)();
        if !self.alive.load(Ordering::SeqCst) {
            return;
        }
        match result {
            Ok(items) => (self.listener.on_update)(items),
            Err(e) => match self.listener.on_error {
                Some(ref on_error) => on_error(&e),
                None => tracing::warn!(key = %self.key, error = %e, "Subscription re-fetch failed"),
            },
        }
    }
}

impl Store {
    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Live list of `user_id`'s subjects.
    pub fn subscribe_to_subjects(
        &self,
        user_id: &str,
        listener: Listener<Subject>,
    ) -> Result<Subscription, StoreError> {
        let store = self.clone();
        let user_id = user_id.to_string();
        self.subscribe(
            format!("subjects_{user_id}"),
            move || store.list_subjects(&user_id),
            listener,
        )
    }

    /// Live list of `user_id`'s files in one subject.
    pub fn subscribe_to_files(
        &self,
        user_id: &str,
        subject_id: &str,
        listener: Listener<FileMetadata>,
    ) -> Result<Subscription, StoreError> {
        let store = self.clone();
        let (user_id, subject_id) = (user_id.to_string(), subject_id.to_string());
        self.subscribe(
            format!("files_{user_id}_{subject_id}"),
            move || store.list_files_in_subject(&user_id, &subject_id),
            listener,
        )
    }

    /// Live list of every file `user_id` owns.
    pub fn subscribe_to_all_user_files(
        &self,
        user_id: &str,
        listener: Listener<FileMetadata>,
    ) -> Result<Subscription, StoreError> {
        let store = self.clone();
        let user_id = user_id.to_string();
        self.subscribe(
            format!("files_{user_id}_all"),
            move || store.list_files(&user_id),
            listener,
        )
    }

    /// Register `fetch` under `key`, then deliver its first result.
    ///
    /// Registration happens first so a write landing during the initial fetch is not missed.
    /// If the initial fetch fails the registration is withdrawn and the error returned.
    pub fn subscribe<T, F>(
        &self,
        key: String,
        fetch: F,
        listener: Listener<T>,
    ) -> Result<Subscription, StoreError>
    where
        T: Send + 'static,
        F: Fn() -> Result<Vec<T>, StoreError> + Send + Sync + 'static,
    {
        let alive = Arc::new(AtomicBool::new(true));
        let feed = Arc::new(Feed {
            key: key.clone(),
            fetch: Box::new(fetch),
            listener,
            alive: Arc::clone(&alive),
            dirty: AtomicBool::new(false),
            gate: Mutex::new(()),
        });

        let gate = feed.gate.lock();

        let feed_cb = Arc::clone(&feed);
        let id = self
            .registry()
            .register(key.clone(), Arc::new(move || feed_cb.refresh()));
        let subscription = Subscription {
            key,
            id,
            registry: Arc::clone(self.registry()),
            alive,
        };

        let initial = (feed.fetch)();
        match initial {
            Ok(items) => (feed.listener.on_update)(items),
            Err(e) => {
                drop(gate);
                subscription.unsubscribe();
                return Err(e);
            }
        }
        drop(gate);

        // Catch notifications that arrived while the initial snapshot was being delivered.
        if feed.dirty.load(Ordering::SeqCst) {
            feed.refresh();
        }

        tracing::debug!(key = %subscription.key, "Subscribed");
        Ok(subscription)
    }
}
