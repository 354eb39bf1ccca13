//! # Signal
//!
//! A typed publish/subscribe channel.
//!
//! ## Dispatch Rules
//!
//! - Listeners run synchronously, on the dispatching thread, in
//!   subscription order.
//! - The listener list is copy-on-write. `dispatch` clones the current
//!   `Arc` snapshot and releases the lock before calling anything, so a
//!   listener may subscribe or unsubscribe (itself or others) without
//!   affecting the dispatch in progress.
//! - A panicking listener is logged and skipped; the rest still run.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

/// Handle returned by [`Signal::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Raw handle value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Listener<T> {
    id: SubscriptionId,
    callback: Callback<T>,
}

impl<T> Clone for Listener<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            callback: Arc::clone(&self.callback),
        }
    }
}

/// Typed synchronous event channel.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use strata_core::signal::Signal;
///
/// let hits = Arc::new(AtomicU32::new(0));
/// let signal: Signal<u32> = Signal::new("damage");
///
/// let counter = Arc::clone(&hits);
/// let sub = signal.subscribe(move |amount| {
///     counter.fetch_add(*amount, Ordering::Relaxed);
/// });
///
/// signal.dispatch(&5);
/// assert!(signal.unsubscribe(sub));
/// signal.dispatch(&5);
/// assert_eq!(hits.load(Ordering::Relaxed), 5);
/// ```
pub struct Signal<T> {
    name: &'static str,
    listeners: Mutex<Arc<Vec<Listener<T>>>>,
    next_id: AtomicU64,
    /// Bumped on every subscribe/unsubscribe.
    version: AtomicU64,
    deferred_tx: Sender<T>,
    deferred_rx: Receiver<T>,
}

impl<T: Send + 'static> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("name", &self.name)
            .field("listeners", &self.listener_count())
            .field("deferred", &self.deferred_rx.len())
            .field("version", &self.version())
            .finish()
    }
}

impl<T: Send + 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new("signal")
    }
}

impl<T: Send + 'static> Signal<T> {
    /// Creates a signal with no listeners. `name` appears in diagnostics.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        let (deferred_tx, deferred_rx) = crossbeam_channel::unbounded();
        Self {
            name,
            listeners: Mutex::new(Arc::new(Vec::new())),
            next_id: AtomicU64::new(1),
            version: AtomicU64::new(0),
            deferred_tx,
            deferred_rx,
        }
    }

    /// Name used in diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Appends a listener. It first runs on the next dispatch that starts
    /// after this call returns.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        {
            let mut listeners = self.listeners.lock();
            Arc::make_mut(&mut listeners).push(Listener {
                id,
                callback: Arc::new(callback),
            });
        }
        self.version.fetch_add(1, Ordering::Release);
        id
    }

    /// Removes a listener. Returns `false` if it was not subscribed.
    ///
    /// A dispatch already in progress still calls the removed listener.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = {
            let mut listeners = self.listeners.lock();
            let Some(pos) = listeners.iter().position(|l| l.id == id) else {
                return false;
            };
            Arc::make_mut(&mut listeners).remove(pos);
            true
        };
        self.version.fetch_add(1, Ordering::Release);
        removed
    }

    /// Removes every listener.
    pub fn unsubscribe_all(&self) {
        *self.listeners.lock() = Arc::new(Vec::new());
        self.version.fetch_add(1, Ordering::Release);
    }

    /// Whether `id` is currently subscribed.
    #[must_use]
    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.listeners.lock().iter().any(|l| l.id == id)
    }

    /// Calls every listener with `event`. Returns the number of listeners
    /// that completed without panicking.
    pub fn dispatch(&self, event: &T) -> usize {
        let snapshot = Arc::clone(&self.listeners.lock());
        let mut completed = 0;
        for listener in snapshot.iter() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| (listener.callback)(event)));
            match outcome {
                Ok(()) => completed += 1,
                Err(payload) => {
                    tracing::error!(
                        signal = self.name,
                        subscription = listener.id.get(),
                        panic = panic_message(payload.as_ref()),
                        "signal listener panicked"
                    );
                }
            }
        }
        completed
    }

    /// Queues `event` for the next [`drain_deferred`](Self::drain_deferred).
    pub fn dispatch_deferred(&self, event: T) {
        if self.deferred_tx.send(event).is_err() {
            tracing::warn!(signal = self.name, "deferred queue closed, event discarded");
        }
    }

    /// Dispatches every event queued before this call, in queue order.
    ///
    /// Events queued by listeners during the drain wait for the next one.
    /// Returns the number of events dispatched.
    pub fn drain_deferred(&self) -> usize {
        let queued = self.deferred_rx.len();
        let mut drained = 0;
        for event in self.deferred_rx.try_iter().take(queued) {
            self.dispatch(&event);
            drained += 1;
        }
        drained
    }

    /// Discards queued events without dispatching them.
    pub fn clear_deferred(&self) -> usize {
        self.deferred_rx.try_iter().count()
    }

    /// Number of queued deferred events.
    #[must_use]
    pub fn pending_deferred(&self) -> usize {
        self.deferred_rx.len()
    }

    /// Number of current listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Whether any listener is subscribed.
    #[must_use]
    pub fn has_listeners(&self) -> bool {
        self.listener_count() > 0
    }

    /// Modification counter, bumped by every subscribe and unsubscribe.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Re-dispatches every event to `target`.
    pub fn chain_to(&self, target: Arc<Signal<T>>) -> SubscriptionId {
        self.subscribe(move |event| {
            target.dispatch(event);
        })
    }

    /// Returns a signal that receives the events matching `predicate`.
    pub fn filter<P>(&self, predicate: P) -> Arc<Signal<T>>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let filtered = Arc::new(Signal::new(self.name));
        let target = Arc::clone(&filtered);
        self.subscribe(move |event| {
            if predicate(event) {
                target.dispatch(event);
            }
        });
        filtered
    }

    /// Returns a signal that receives every event transformed by `map`.
    pub fn map<R, M>(&self, map: M) -> Arc<Signal<R>>
    where
        R: Send + 'static,
        M: Fn(&T) -> R + Send + Sync + 'static,
    {
        let mapped = Arc::new(Signal::new(self.name));
        let target = Arc::clone(&mapped);
        self.subscribe(move |event| {
            target.dispatch(&map(event));
        });
        mapped
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
