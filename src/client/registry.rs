//! # Callback Registry
//!
//! Observer fan-out shared by the network monitor and the realtime channel.
//!
//! Subscribers are stored behind `Arc` so [`CallbackRegistry::emit`] can take a
//! snapshot and release the lock before invoking anything. A callback may
//! therefore register or unsubscribe (itself or others) while an emit is in
//! progress without deadlocking; the change applies from the next emit.
//!
//! A panicking callback is logged and skipped; the remaining callbacks still
//! receive the value.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

/// Identifier of one registered callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct RegistryInner<T> {
    next_id: u64,
    callbacks: BTreeMap<ListenerId, Callback<T>>,
}

trait Detach: Send + Sync {
    fn detach(&self, id: ListenerId) -> bool;
}

impl<T: 'static> Detach for Mutex<RegistryInner<T>> {
    fn detach(&self, id: ListenerId) -> bool {
        lock(self).callbacks.remove(&id).is_some()
    }
}

fn lock<T>(mutex: &Mutex<RegistryInner<T>>) -> MutexGuard<'_, RegistryInner<T>> {
    // Callbacks never run under the lock, so poisoning only follows a panic in
    // our own bookkeeping; the map is still consistent.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Set of callbacks for one event kind
pub struct CallbackRegistry<T> {
    inner: Arc<Mutex<RegistryInner<T>>>,
}

impl<T: 'static> CallbackRegistry<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RegistryInner {
                next_id: 0,
                callbacks: BTreeMap::new(),
            })),
        }
    }

    /// Register a callback, returning a handle that removes exactly this one
    pub fn register<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = {
            let mut inner = lock(&self.inner);
            let id = ListenerId(inner.next_id);
            inner.next_id += 1;
            inner.callbacks.insert(id, Arc::new(callback));
            id
        };
        let weak: Weak<Mutex<RegistryInner<T>>> = Arc::downgrade(&self.inner);
        let registry: Weak<dyn Detach> = weak;
        Subscription { id, registry }
    }

    /// Remove a callback by id. Returns whether it was registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        self.inner.detach(id)
    }

    /// Deliver `value` to every callback registered at the time of the call.
    ///
    /// Returns the number of callbacks that completed without panicking.
    pub fn emit(&self, value: &T) -> usize {
        let snapshot: Vec<(ListenerId, Callback<T>)> = lock(&self.inner)
            .callbacks
            .iter()
            .map(|(id, callback)| (*id, Arc::clone(callback)))
            .collect();

        let mut delivered = 0;
        for (id, callback) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| callback(value))) {
                Ok(()) => delivered += 1,
                Err(_) => tracing::error!("Callback {:?} panicked; continuing fan-out", id),
            }
        }
        delivered
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every callback
    pub fn clear(&self) {
        lock(&self.inner).callbacks.clear();
    }
}

impl<T: 'static> Default for CallbackRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for CallbackRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = lock(&self.inner).callbacks.len();
        f.debug_struct("CallbackRegistry").field("callbacks", &len).finish()
    }
}

/// Handle returned by [`CallbackRegistry::register`].
///
/// Dropping the handle keeps the callback registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[must_use = "keep the subscription to be able to unsubscribe"]
pub struct Subscription {
    id: ListenerId,
    registry: Weak<dyn Detach>,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Remove only the callback this handle was created for
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.detach(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
