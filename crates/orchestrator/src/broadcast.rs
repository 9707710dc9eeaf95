//! Callback fan-out with per-subscriber failure isolation.

use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::warn;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;
type Slots<T> = Mutex<Vec<(u64, Callback<T>)>>;

/// Ordered list of subscriber callbacks.
///
/// A callback that panics is logged and skipped; the rest of the list is
/// still notified in order.
pub struct SubscriberList<T> {
    next_id: AtomicU64,
    slots: Arc<Slots<T>>,
}

impl<T> Default for SubscriberList<T> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            slots: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T: 'static> SubscriberList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.slots.lock().push((id, Arc::new(callback)));

        let slots: Weak<Slots<T>> = Arc::downgrade(&self.slots);
        Subscription {
            id,
            remove: Some(Box::new(move || {
                if let Some(slots) = slots.upgrade() {
                    slots.lock().retain(|(slot_id, _)| *slot_id != id);
                }
            })),
        }
    }

    /// Deliver `value` to every subscriber. Returns how many returned normally.
    pub fn notify(&self, value: &T) -> usize {
        // Snapshot so callbacks may (un)subscribe without deadlocking
        let callbacks: Vec<(u64, Callback<T>)> = self.slots.lock().clone();

        let mut delivered = 0;
        for (id, callback) in callbacks {
            match catch_unwind(AssertUnwindSafe(|| callback(value))) {
                Ok(()) => delivered += 1,
                Err(_) => warn!(subscriber = id, "subscriber panicked, skipping"),
            }
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }
}

/// Handle returned by `subscribe`. Dropping it keeps the subscription alive;
/// call [`Subscription::unsubscribe`] to remove exactly this callback.
pub struct Subscription {
    id: u64,
    remove: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn unsubscribe(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
