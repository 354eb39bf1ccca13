//! # Signal Registry
//!
//! Maps channel types to their [`Signal`]s.
//!
//! A channel is a zero-sized marker type implementing [`Channel`]; its
//! associated `Event` fixes the payload shape. The registry is shared
//! (`Arc<SignalRegistry>`) so loader threads can queue deferred events.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::signal::{Signal, SubscriptionId};
use crate::error::{EcsError, EcsResult};

/// A typed signal channel.
///
/// # Example
///
/// ```rust
/// use strata_core::signal::{Channel, SignalRegistry};
///
/// struct ScoreChanged;
/// impl Channel for ScoreChanged {
///     type Event = u32;
///     const NAME: &'static str = "score-changed";
/// }
///
/// let signals = SignalRegistry::new();
/// signals.subscribe::<ScoreChanged, _>(|score| assert_eq!(*score, 10)).unwrap();
/// assert!(signals.dispatch::<ScoreChanged>(&10));
/// ```
pub trait Channel: 'static {
    /// Payload carried by the channel.
    type Event: Send + 'static;
    /// Name used in diagnostics.
    const NAME: &'static str;
}

/// Handle for a registry subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Subscription {
    channel: TypeId,
    channel_name: &'static str,
    id: SubscriptionId,
}

impl Subscription {
    /// Name of the channel subscribed to.
    #[must_use]
    pub const fn channel_name(&self) -> &'static str {
        self.channel_name
    }

    /// Handle within the channel's signal.
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }
}

/// Channel-independent operations used for bulk maintenance.
trait ErasedSignal: Send + Sync {
    fn name(&self) -> &'static str;
    fn drain_deferred(&self) -> usize;
    fn clear(&self);
    fn listener_count(&self) -> usize;
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
    fn as_any(&self) -> &dyn Any;
}

impl<E: Send + 'static> ErasedSignal for Arc<Signal<E>> {
    fn name(&self) -> &'static str {
        Signal::name(self)
    }

    fn drain_deferred(&self) -> usize {
        Signal::drain_deferred(self)
    }

    fn clear(&self) {
        self.unsubscribe_all();
        self.clear_deferred();
    }

    fn listener_count(&self) -> usize {
        Signal::listener_count(self)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        Signal::unsubscribe(self, id)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Default)]
struct Channels {
    signals: HashMap<TypeId, Arc<dyn ErasedSignal>>,
    /// Registration order, so bulk drains are deterministic.
    order: Vec<TypeId>,
    sealed: bool,
}

/// Thread-safe table of signals keyed by channel type.
#[derive(Default)]
pub struct SignalRegistry {
    channels: RwLock<Channels>,
}

impl std::fmt::Debug for SignalRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let channels = self.channels.read();
        let names: Vec<_> = channels
            .order
            .iter()
            .filter_map(|key| channels.signals.get(key).map(|s| s.name()))
            .collect();
        f.debug_struct("SignalRegistry")
            .field("channels", &names)
            .field("sealed", &channels.sealed)
            .finish()
    }
}

impl SignalRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers channel `C`, returning its signal. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::RegistrySealed`] if `C` is new and the registry
    /// is sealed.
    pub fn register<C: Channel>(&self) -> EcsResult<Arc<Signal<C::Event>>> {
        if let Some(signal) = self.signal::<C>() {
            return Ok(signal);
        }

        let mut channels = self.channels.write();
        // Another thread may have registered between the locks.
        if let Some(existing) = Self::lookup::<C>(&channels) {
            return Ok(existing);
        }
        if channels.sealed {
            return Err(EcsError::RegistrySealed);
        }

        let signal = Arc::new(Signal::new(C::NAME));
        channels
            .signals
            .insert(TypeId::of::<C>(), Arc::new(Arc::clone(&signal)));
        channels.order.push(TypeId::of::<C>());
        tracing::debug!(channel = C::NAME, "registered signal channel");
        Ok(signal)
    }

    /// Signal of channel `C`, if registered.
    #[must_use]
    pub fn signal<C: Channel>(&self) -> Option<Arc<Signal<C::Event>>> {
        Self::lookup::<C>(&self.channels.read())
    }

    fn lookup<C: Channel>(channels: &Channels) -> Option<Arc<Signal<C::Event>>> {
        channels
            .signals
            .get(&TypeId::of::<C>())?
            .as_any()
            .downcast_ref::<Arc<Signal<C::Event>>>()
            .cloned()
    }

    /// Whether channel `C` is registered.
    #[must_use]
    pub fn is_registered<C: Channel>(&self) -> bool {
        self.channels.read().signals.contains_key(&TypeId::of::<C>())
    }

    /// Subscribes to channel `C`, registering it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::RegistrySealed`] if `C` is new and the registry
    /// is sealed.
    pub fn subscribe<C, F>(&self, callback: F) -> EcsResult<Subscription>
    where
        C: Channel,
        F: Fn(&C::Event) + Send + Sync + 'static,
    {
        let id = self.register::<C>()?.subscribe(callback);
        Ok(Subscription {
            channel: TypeId::of::<C>(),
            channel_name: C::NAME,
            id,
        })
    }

    /// Removes a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        self.channels
            .read()
            .signals
            .get(&subscription.channel)
            .is_some_and(|signal| signal.unsubscribe(subscription.id))
    }

    /// Dispatches `event` on channel `C` immediately. Returns `false` if
    /// the channel is not registered.
    pub fn dispatch<C: Channel>(&self, event: &C::Event) -> bool {
        // Clone the signal out so listeners can use the registry.
        match self.signal::<C>() {
            Some(signal) => {
                signal.dispatch(event);
                true
            }
            None => false,
        }
    }

    /// Queues `event` on channel `C` for the next drain.
    pub fn dispatch_deferred<C: Channel>(&self, event: C::Event) -> bool {
        match self.signal::<C>() {
            Some(signal) => {
                signal.dispatch_deferred(event);
                true
            }
            None => false,
        }
    }

    /// Drains the deferred queue of every channel, in registration order.
    /// Returns the number of events dispatched.
    pub fn drain_deferred(&self) -> usize {
        // Release the lock before dispatching so listeners can register.
        let signals: Vec<Arc<dyn ErasedSignal>> = {
            let channels = self.channels.read();
            channels
                .order
                .iter()
                .filter_map(|key| channels.signals.get(key).cloned())
                .collect()
        };
        signals.iter().map(|signal| signal.drain_deferred()).sum()
    }

    /// Removes channel `C` and all of its listeners.
    pub fn unregister<C: Channel>(&self) -> bool {
        let mut channels = self.channels.write();
        let key = TypeId::of::<C>();
        channels.order.retain(|k| *k != key);
        channels.signals.remove(&key).is_some()
    }

    /// Drops every listener and queued event, keeping the channels.
    pub fn clear_listeners(&self) {
        for signal in self.channels.read().signals.values() {
            signal.clear();
        }
    }

    /// Stops accepting new channels.
    pub fn seal(&self) {
        self.channels.write().sealed = true;
    }

    /// Whether the registry is sealed.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.channels.read().sealed
    }

    /// Number of registered channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.read().signals.len()
    }

    /// Total listeners across all channels.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.channels
            .read()
            .signals
            .values()
            .map(|s| s.listener_count())
            .sum()
    }
}
