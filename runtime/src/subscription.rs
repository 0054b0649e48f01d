//! Selector subscriptions.
//!
//! Each subscription pairs a [`Memoized`] selector with a synchronous
//! callback. After every committed reduction the store walks the registry,
//! and a callback runs only when its selector's output changed structurally.
//!
//! Callbacks run while the store still holds its dispatch gate, and
//! [`Store::send`](crate::Store::send) is async, so a callback cannot reduce
//! reentrantly. A callback that wants to dispatch must spawn the dispatch.

use statecraft_core::selector::{Memoized, Selector};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::metrics::SubscriptionMetrics;

/// Something that reacts to committed snapshots.
trait Observer<S>: Send {
    /// Returns `true` if the callback ran.
    fn observe(&mut self, state: &Arc<S>) -> bool;
}

struct SelectorObserver<S, Sel: Selector<S>, F> {
    memo: Memoized<S, Sel>,
    callback: F,
}

impl<S, Sel, F> Observer<S> for SelectorObserver<S, Sel, F>
where
    S: Send + Sync,
    Sel: Selector<S>,
    F: Fn(&Sel::Output) + Send,
{
    fn observe(&mut self, state: &Arc<S>) -> bool {
        match self.memo.refresh(state) {
            Some(output) => {
                (self.callback)(output);
                true
            },
            None => false,
        }
    }
}

struct Entry<S> {
    id: u64,
    observer: Box<dyn Observer<S>>,
}

struct Entries<S> {
    next_id: u64,
    active: Vec<Entry<S>>,
    notifying: bool,
    detached_while_notifying: Vec<u64>,
}

/// The set of live subscriptions for one store.
pub(crate) struct Registry<S> {
    entries: Mutex<Entries<S>>,
}

impl<S: Send + Sync + 'static> Registry<S> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(Entries {
                next_id: 0,
                active: Vec::new(),
                notifying: false,
                detached_while_notifying: Vec::new(),
            }),
        }
    }

    /// Register `callback` for `selector`, primed with the snapshot returned
    /// by `current` so that the first notification is the first actual change.
    ///
    /// `current` is read under the registry lock: a commit that lands
    /// concurrently is either already in the primed snapshot or notifies the
    /// new entry.
    pub(crate) fn attach<Sel, F>(
        self: &Arc<Self>,
        selector: Sel,
        callback: F,
        current: impl FnOnce() -> Arc<S>,
    ) -> Subscription
    where
        Sel: Selector<S>,
        F: Fn(&Sel::Output) + Send + 'static,
    {
        let mut entries = self.lock();
        let observer = SelectorObserver {
            memo: Memoized::primed(selector, &current()),
            callback,
        };
        let id = entries.next_id;
        entries.next_id += 1;
        entries.active.push(Entry {
            id,
            observer: Box::new(observer),
        });
        SubscriptionMetrics::record_active(entries.active.len());
        drop(entries);

        tracing::debug!(subscription = id, "Subscription attached");

        // Unsized coercion happens on the strong pointer before downgrading.
        let registry: Arc<dyn Detach> = Arc::clone(self) as Arc<dyn Detach>;
        Subscription {
            id,
            registry: Some(Arc::downgrade(&registry)),
        }
    }

    /// Run every observer against `state`.
    ///
    /// The lock is released while callbacks run, so a callback may attach or
    /// cancel subscriptions (including its own).
    pub(crate) fn notify(&self, state: &Arc<S>) {
        let mut running = {
            let mut entries = self.lock();
            entries.notifying = true;
            std::mem::take(&mut entries.active)
        };

        let notified = running
            .iter_mut()
            .map(|entry| entry.observer.observe(state))
            .filter(|ran| *ran)
            .count();

        let mut entries = self.lock();
        entries.notifying = false;
        // Attached during the walk
        running.append(&mut entries.active);
        let detached = std::mem::take(&mut entries.detached_while_notifying);
        running.retain(|entry| !detached.contains(&entry.id));
        entries.active = running;
        SubscriptionMetrics::record_active(entries.active.len());
        drop(entries);

        if notified > 0 {
            tracing::trace!(notified, "Subscribers notified");
            SubscriptionMetrics::record_notified(notified);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().active.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Entries<S>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

trait Detach: Send + Sync {
    fn detach(&self, id: u64);
}

impl<S: Send + Sync + 'static> Detach for Registry<S> {
    fn detach(&self, id: u64) {
        let mut entries = self.lock();
        if entries.notifying {
            entries.detached_while_notifying.push(id);
        } else {
            entries.active.retain(|entry| entry.id != id);
            SubscriptionMetrics::record_active(entries.active.len());
        }
        tracing::debug!(subscription = id, "Subscription detached");
    }
}

/// Handle to a registered subscription.
///
/// Delivery stops when the handle is cancelled or dropped. Use
/// [`Subscription::detach`] to keep the subscription alive for the lifetime
/// of the store instead.
#[must_use = "dropping a Subscription cancels it"]
pub struct Subscription {
    id: u64,
    registry: Option<Weak<dyn Detach>>,
}

impl Subscription {
    /// Stop delivery.
    pub fn cancel(mut self) {
        self.release();
    }

    /// Keep delivering until the store is dropped, without holding a handle.
    pub fn detach(mut self) {
        self.registry = None;
    }

    fn release(&mut self) {
        if let Some(registry) = self.registry.take().and_then(|weak| weak.upgrade()) {
            registry.detach(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("attached", &self.registry.is_some())
            .finish()
    }
}
