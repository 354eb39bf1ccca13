//! # Signal Bus
//!
//! Typed synchronous publish/subscribe.
//!
//! - [`Signal`]: one channel, copy-on-write listener list, deferred queue
//! - [`SignalRegistry`]: channels keyed by marker type
//! - [`channels`]: the engine channels every world dispatches

pub mod channels;
mod registry;
#[allow(clippy::module_inception)]
mod signal;

pub use channels::{
    EngineStopped, EngineUpdate, EntityCreated, EntityDestroyed, SceneChange, SceneChanged,
    UpdateEvent,
};
pub use registry::{Channel, SignalRegistry, Subscription};
pub use signal::{Signal, SubscriptionId};
pub(crate) use signal::panic_message;
