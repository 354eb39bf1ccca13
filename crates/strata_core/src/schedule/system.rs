//! # Systems
//!
//! A system is a unit of per-frame or fixed-step logic. Every hook gets a
//! [`SystemContext`] and returns a [`SystemResult`]; an `Err` (or a panic)
//! is logged and counted by the scheduler without stopping the pass.

use std::any::{type_name, Any};
use std::time::Duration;

use crate::ecs::{
    CommandSender, Component, ComponentStore, ComponentTypeId, EntityId, TypeSet,
};
use crate::error::{EcsResult, SystemResult};
use crate::signal::SignalRegistry;

/// Runs before everything else.
pub const PRIORITY_HIGHEST: i32 = i32::MIN;
/// Early systems (input, lifetimes).
pub const PRIORITY_HIGH: i32 = -100;
/// Default priority.
pub const PRIORITY_NORMAL: i32 = 0;
/// Late systems.
pub const PRIORITY_LOW: i32 = 100;
/// Runs after everything else (transform propagation).
pub const PRIORITY_LOWEST: i32 = i32::MAX;

/// Per-frame or fixed-step logic.
///
/// Lower priorities run first; ties run in registration order.
///
/// # Example
///
/// ```rust
/// use strata_core::schedule::{System, SystemContext};
/// use strata_core::error::SystemResult;
///
/// #[derive(Default)]
/// struct FrameCounter(u64);
///
/// impl System for FrameCounter {
///     fn update(&mut self, _ctx: &mut SystemContext<'_>, _dt: f32) -> SystemResult {
///         self.0 += 1;
///         Ok(())
///     }
/// }
/// ```
pub trait System: Send + 'static {
    /// Name used in logs and stats.
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }

    /// Run order; read once when the system is added.
    fn priority(&self) -> i32 {
        PRIORITY_NORMAL
    }

    /// Called once before the first pass that includes this system.
    fn initialize(&mut self, _ctx: &mut SystemContext<'_>) -> SystemResult {
        Ok(())
    }

    /// Variable-step hook.
    fn update(&mut self, _ctx: &mut SystemContext<'_>, _dt: f32) -> SystemResult {
        Ok(())
    }

    /// Fixed-step hook.
    fn fixed_update(&mut self, _ctx: &mut SystemContext<'_>, _dt: f32) -> SystemResult {
        Ok(())
    }

    /// Called once when the system is removed or the world is disposed.
    fn dispose(&mut self, _ctx: &mut SystemContext<'_>) -> SystemResult {
        Ok(())
    }
}

/// Object-safe view with downcasting, implemented for every [`System`].
pub(crate) trait SystemObject: System {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<S: System> SystemObject for S {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Lifecycle of a registered system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SystemState {
    /// Added, `initialize` not yet run.
    Registered,
    /// Initialized and running.
    Enabled,
    /// Initialized (or failed to) and skipped by passes.
    Disabled,
    /// `dispose` has run. Terminal.
    Disposed,
}

/// Execution statistics for one system.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SystemStats {
    /// Hook invocations (update and fixed update).
    pub runs: u64,
    /// Hooks that returned an error or panicked.
    pub faults: u64,
    /// Duration of the most recent hook.
    pub last_duration: Duration,
    /// Total time spent in hooks.
    pub total_duration: Duration,
}

impl SystemStats {
    /// Mean hook duration.
    #[must_use]
    pub fn average_duration(&self) -> Duration {
        if self.runs == 0 {
            return Duration::ZERO;
        }
        self.total_duration / u32::try_from(self.runs).unwrap_or(u32::MAX)
    }
}

/// What a system hook can see of the world.
///
/// Components can be read and edited in place. Structural changes
/// (spawn, destroy, insert, remove) are only reachable through
/// [`commands`](Self::commands) and become visible after the pass.
pub struct SystemContext<'a> {
    components: &'a mut ComponentStore,
    signals: &'a SignalRegistry,
    commands: &'a CommandSender,
    frame: u64,
    elapsed: f64,
}

impl std::fmt::Debug for SystemContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemContext")
            .field("frame", &self.frame)
            .field("elapsed", &self.elapsed)
            .finish_non_exhaustive()
    }
}

impl<'a> SystemContext<'a> {
    pub(crate) fn new(
        components: &'a mut ComponentStore,
        signals: &'a SignalRegistry,
        commands: &'a CommandSender,
        frame: u64,
        elapsed: f64,
    ) -> Self {
        Self {
            components,
            signals,
            commands,
            frame,
            elapsed,
        }
    }

    /// Component data, read-only.
    #[must_use]
    pub fn components(&self) -> &ComponentStore {
        &*self.components
    }

    /// Full store access for the built-in systems.
    pub(crate) fn store_mut(&mut self) -> &mut ComponentStore {
        &mut *self.components
    }

    /// Shorthand for `components().get(id)`.
    #[must_use]
    pub fn get<C: Component>(&self, id: EntityId) -> Option<&C> {
        self.components.get(id)
    }

    /// Gets the `C` of `id` for an in-place edit.
    pub fn get_mut<C: Component>(&mut self, id: EntityId) -> Option<&mut C> {
        self.components.get_mut(id)
    }

    /// Edits the `C` of every entity matched by `set` in place.
    /// See [`ComponentStore::for_each_mut`].
    pub fn for_each_mut<C, F>(&mut self, set: &TypeSet, f: F)
    where
        C: Component,
        F: FnMut(EntityId, &mut C),
    {
        self.components.for_each_mut(set, f);
    }

    /// Registers `C` so queries built afterwards can name it. No entity
    /// gains or loses a component.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::RegistrySealed`](crate::EcsError::RegistrySealed)
    /// or [`EcsError::CapacityExhausted`](crate::EcsError::CapacityExhausted)
    /// if `C` is new and cannot be registered.
    pub fn register_component<C: Component>(&mut self) -> EcsResult<ComponentTypeId> {
        self.components.registry_mut().try_register::<C>()
    }

    /// The world's signals.
    #[must_use]
    pub fn signals(&self) -> &SignalRegistry {
        self.signals
    }

    /// Queue for structural changes, applied after the pass.
    #[must_use]
    pub fn commands(&self) -> &CommandSender {
        self.commands
    }

    /// Index of the current frame, starting at 0.
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Seconds elapsed since the world was created.
    #[must_use]
    pub const fn elapsed(&self) -> f64 {
        self.elapsed
    }
}
