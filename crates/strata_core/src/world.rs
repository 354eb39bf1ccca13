//! # World
//!
//! The façade that owns one complete runtime: identity pool, component
//! store, signal bus, scheduler and mutation queue.
//!
//! ## Frame Structure
//!
//! ```text
//! tick(frame_dt)
//!   ├─ fixed_update(step) × N      N from the fixed-step accumulator
//!   │    ├─ fixed hooks (priority order)
//!   │    └─ commit
//!   └─ update(dt)
//!        ├─ engine-update signal
//!        ├─ update hooks (priority order)
//!        ├─ commit                 structural changes become visible here
//!        └─ deferred signals drained
//! ```
//!
//! Calls made directly on the world outside a pass (`spawn`, `insert`,
//! `set_parent`, ...) apply immediately. `destroy` is always deferred to the
//! next commit so iteration in flight never sees a hole.
//!
//! Worlds share no state: two worlds in one process are fully independent.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::config::{ConfigError, WorldConfig};
use crate::ecs::{
    Active, Command, CommandQueue, CommandSender, Component, ComponentStore, ComponentTypeId,
    EntityId, IdentityPool, Name, QueryIter, StoragePolicy, TypeSet, TypeSetBuilder,
};
use crate::error::{EcsError, EcsResult};
use crate::schedule::{FixedStep, Scheduler, System, SystemContext, SystemState, SystemStats};
use crate::signal::channels::{
    register_engine_channels, EngineStopped, EngineUpdate, EntityCreated, EntityDestroyed,
    SceneChange, SceneChanged, UpdateEvent,
};
use crate::signal::SignalRegistry;
use crate::transform::{
    LifetimeSystem, Transform, TransformGraph, TransformPropagationSystem, Trs,
};

/// Snapshot of a world's bookkeeping, for debug overlays and logs.
#[derive(Clone, Debug, PartialEq)]
pub struct WorldStats {
    /// Live entities.
    pub entity_count: usize,
    /// Identifier slots allocated by the pool.
    pub entity_capacity: usize,
    /// Hard limit on distinct identifiers.
    pub max_entities: usize,
    /// Registered systems.
    pub system_count: usize,
    /// Systems currently enabled.
    pub enabled_systems: usize,
    /// Faults reported by system hooks so far.
    pub system_faults: u64,
    /// Registered component types.
    pub component_types: usize,
    /// Commands waiting for the next commit.
    pub pending_commands: usize,
    /// Registered signal channels.
    pub signal_channels: usize,
    /// Listeners across all channels.
    pub listeners: usize,
    /// Completed `update` calls.
    pub frame: u64,
    /// Seconds accumulated by `update`.
    pub elapsed: f64,
    /// Active scene.
    pub scene: Option<String>,
    /// Whether [`World::dispose`] has run.
    pub disposed: bool,
}

impl fmt::Display for WorldStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frame {} | {} entities | {}/{} systems | {} component types | {} pending",
            self.frame,
            self.entity_count,
            self.enabled_systems,
            self.system_count,
            self.component_types,
            self.pending_commands,
        )
    }
}

/// One independent runtime instance.
///
/// # Example
///
/// ```rust
/// use strata_core::World;
/// use strata_core::transform::{Transform, Vec3};
///
/// let mut world = World::with_defaults();
/// let root = world.spawn().unwrap();
/// let child = world.spawn().unwrap();
/// world.insert(root, Transform::default()).unwrap();
/// world.insert(child, Transform::from_translation(Vec3::X)).unwrap();
/// world.set_parent(child, Some(root)).unwrap();
///
/// world.update(1.0 / 60.0);
///
/// let position = world.get::<Transform>(child).unwrap().world_translation();
/// assert_eq!(position, Vec3::X);
/// ```
pub struct World {
    store: ComponentStore,
    scheduler: Scheduler,
    signals: Arc<SignalRegistry>,
    queue: CommandQueue,
    sender: CommandSender,
    clock: FixedStep,
    config: WorldConfig,
    frame: u64,
    elapsed: f64,
    scene: Option<String>,
    disposed: bool,
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("frame", &self.frame)
            .field("entities", &self.store.entity_count())
            .field("scheduler", &self.scheduler)
            .field("scene", &self.scene)
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl World {
    /// Creates a world from `config`.
    ///
    /// # Panics
    ///
    /// Panics if `config` fails validation. Use [`try_new`](Self::try_new)
    /// for configs read from disk.
    #[must_use]
    pub fn new(config: WorldConfig) -> Self {
        match Self::try_new(config) {
            Ok(world) => world,
            Err(err) => panic!("{err}"),
        }
    }

    /// Creates a world with [`WorldConfig::default`].
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(WorldConfig::default())
    }

    /// Creates a world from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `config` fails validation.
    pub fn try_new(config: WorldConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let pool = Arc::new(IdentityPool::new(
            config.initial_entity_capacity,
            config.max_entities as usize,
        ));
        let store = ComponentStore::new(
            Arc::clone(&pool),
            StoragePolicy {
                initial_capacity: config.initial_component_capacity,
                growth_factor: config.component_growth_factor,
                recycle_limit: config.component_recycle_limit,
            },
        );
        let signals = Arc::new(SignalRegistry::new());
        if let Err(err) = register_engine_channels(&signals) {
            tracing::error!(%err, "failed to register engine channels");
        }
        let queue = CommandQueue::new();
        let sender = queue.sender(pool);

        let mut world = Self {
            store,
            scheduler: Scheduler::new(),
            signals,
            queue,
            sender,
            clock: FixedStep::new(config.fixed_timestep, config.max_fixed_steps_per_frame),
            config,
            frame: 0,
            elapsed: 0.0,
            scene: None,
            disposed: false,
        };

        if world.config.builtin_systems {
            world.add_builtin(LifetimeSystem::default());
            world.add_builtin(TransformPropagationSystem::default());
        }

        tracing::info!(
            max_entities = world.config.max_entities,
            fixed_timestep = world.config.fixed_timestep,
            systems = world.scheduler.len(),
            "world created"
        );
        Ok(world)
    }

    fn add_builtin<S: System>(&mut self, system: S) {
        if let Err(err) = self.scheduler.add(system) {
            tracing::error!(%err, "built-in system rejected");
        }
    }

    fn ensure_active(&self) -> EcsResult<()> {
        if self.disposed {
            Err(EcsError::WorldDisposed)
        } else {
            Ok(())
        }
    }

    /// Splits the world into the scheduler and a context over everything
    /// else, so hooks can run against the store while the scheduler is
    /// borrowed.
    fn split(&mut self) -> (&mut Scheduler, SystemContext<'_>) {
        let ctx = SystemContext::new(
            &mut self.store,
            &self.signals,
            &self.sender,
            self.frame,
            self.elapsed,
        );
        (&mut self.scheduler, ctx)
    }

    /// The configuration this world was built with.
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// The world's signal bus. Clone the `Arc` to subscribe from elsewhere.
    #[must_use]
    pub fn signals(&self) -> &Arc<SignalRegistry> {
        &self.signals
    }

    /// The shared identity pool.
    #[must_use]
    pub fn pool(&self) -> &Arc<IdentityPool> {
        self.store.pool()
    }

    /// Component data, read-only.
    #[must_use]
    pub const fn components(&self) -> &ComponentStore {
        &self.store
    }

    /// Component data for in-place edits. Structural changes go through
    /// the world's own methods.
    pub fn components_mut(&mut self) -> &mut ComponentStore {
        &mut self.store
    }

    /// The system scheduler, read-only.
    #[must_use]
    pub const fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Completed `update` calls.
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Seconds accumulated by `update`.
    #[must_use]
    pub const fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// The fixed-step clock driven by [`tick`](Self::tick).
    #[must_use]
    pub const fn clock(&self) -> &FixedStep {
        &self.clock
    }

    /// Interpolation factor between the last two fixed steps.
    #[must_use]
    pub fn fixed_alpha(&self) -> f32 {
        self.clock.alpha()
    }

    /// Whether [`dispose`](Self::dispose) has run.
    #[must_use]
    pub const fn is_disposed(&self) -> bool {
        self.disposed
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Creates a live entity and dispatches entity-created.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::WorldDisposed`] after disposal.
    ///
    /// # Panics
    ///
    /// Panics when the identity pool is exhausted.
    pub fn spawn(&mut self) -> EcsResult<EntityId> {
        self.ensure_active()?;
        let id = self.store.spawn();
        self.signals.dispatch::<EntityCreated>(&id);
        Ok(id)
    }

    /// Creates an entity carrying a [`Name`] and an [`Active`] flag.
    ///
    /// # Errors
    ///
    /// See [`spawn`](Self::spawn).
    pub fn spawn_named(&mut self, name: impl Into<String>) -> EcsResult<EntityId> {
        let id = self.spawn()?;
        self.store.insert(id, Name::new(name))?;
        self.store.insert(id, Active::default())?;
        Ok(id)
    }

    /// Queues `id` for destruction at the next commit.
    ///
    /// # Errors
    ///
    /// - [`EcsError::WorldDisposed`] after disposal.
    /// - [`EcsError::InvalidEntity`] if `id` is not live.
    pub fn destroy(&mut self, id: EntityId) -> EcsResult<()> {
        self.ensure_active()?;
        self.store.validate(id)?;
        self.sender.destroy(id);
        Ok(())
    }

    fn destroy_now(&mut self, id: EntityId) -> EcsResult<()> {
        self.store.validate(id)?;
        self.signals.dispatch::<EntityDestroyed>(&id);
        if self.store.has::<Transform>(id) {
            self.store.storage_mut::<Transform>()?.isolate(id);
        }
        self.store.despawn(id)
    }

    /// Whether `id` is live.
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.store.is_alive(id)
    }

    /// Number of live entities.
    #[must_use]
    pub const fn entity_count(&self) -> usize {
        self.store.entity_count()
    }

    /// Live entities in ascending index order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.store.entities()
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Registers `C` ahead of first use, e.g. before sealing the registry.
    ///
    /// # Errors
    ///
    /// - [`EcsError::WorldDisposed`] after disposal.
    /// - [`EcsError::RegistrySealed`] if `C` is new and the registry is sealed.
    /// - [`EcsError::CapacityExhausted`] when the type id space is full.
    pub fn register_component<C: Component>(&mut self) -> EcsResult<ComponentTypeId> {
        self.ensure_active()?;
        self.store.registry_mut().try_register::<C>()
    }

    /// Attaches `component` to `id`, returning the value it replaced.
    ///
    /// A replacing [`Transform`] keeps the hierarchy position of the one it
    /// replaces; a new one starts as a root. Either way it is marked dirty.
    ///
    /// # Errors
    ///
    /// - [`EcsError::WorldDisposed`] after disposal.
    /// - [`EcsError::InvalidEntity`] if `id` is not live.
    /// - [`EcsError::RegistrySealed`] if `C` is new and the registry is sealed.
    pub fn insert<C: Component>(&mut self, id: EntityId, component: C) -> EcsResult<Option<C>> {
        self.ensure_active()?;
        let mut component = component;
        if let Some(transform) = (&mut component as &mut dyn Any).downcast_mut::<Transform>() {
            match self.store.get::<Transform>(id) {
                Some(existing) => transform.adopt_links(existing),
                None => transform.clear_links(),
            }
            transform.mark_dirty();
        }
        self.store.insert(id, component)
    }

    /// The `C` of `id`, if any.
    #[must_use]
    pub fn get<C: Component>(&self, id: EntityId) -> Option<&C> {
        self.store.get(id)
    }

    /// The `C` of `id`, mutably.
    pub fn get_mut<C: Component>(&mut self, id: EntityId) -> Option<&mut C> {
        self.store.get_mut(id)
    }

    /// Detaches the `C` of `id`. Removing a [`Transform`] first takes the
    /// node out of the hierarchy; its children become roots.
    ///
    /// # Errors
    ///
    /// - [`EcsError::WorldDisposed`] after disposal.
    /// - [`EcsError::InvalidEntity`] if `id` is not live.
    pub fn remove<C: Component>(&mut self, id: EntityId) -> EcsResult<Option<C>> {
        self.ensure_active()?;
        if TypeId::of::<C>() == TypeId::of::<Transform>() && self.store.has::<Transform>(id) {
            self.store.storage_mut::<Transform>()?.isolate(id);
        }
        self.store.remove(id)
    }

    /// Whether `id` holds a `C`.
    #[must_use]
    pub fn has<C: Component>(&self, id: EntityId) -> bool {
        self.store.has::<C>(id)
    }

    /// Type names of every component attached to `id`, in registration
    /// order. Empty for stale ids.
    pub fn component_names(&self, id: EntityId) -> impl Iterator<Item = &'static str> + '_ {
        self.store
            .component_types(id)
            .filter_map(|ty| self.store.registry().name_of(ty))
    }

    /// Starts building a reusable query [`TypeSet`].
    #[must_use]
    pub fn type_set(&self) -> TypeSetBuilder<'_> {
        self.store.type_set()
    }

    /// Live entities holding every type in `set`, in ascending index order.
    #[must_use]
    pub fn for_each_with<'a>(&'a self, set: &'a TypeSet) -> QueryIter<'a> {
        self.store.for_each_with(set)
    }

    /// Calls `f` with the `C` of every entity matched by `set`.
    pub fn for_each_mut<C, F>(&mut self, set: &TypeSet, f: F)
    where
        C: Component,
        F: FnMut(EntityId, &mut C),
    {
        self.store.for_each_mut(set, f);
    }

    // =========================================================================
    // Hierarchy
    // =========================================================================

    /// Moves `child` under `parent`, or makes it a root when `parent` is
    /// `None`.
    ///
    /// # Errors
    ///
    /// - [`EcsError::WorldDisposed`] after disposal.
    /// - [`EcsError::InvalidEntity`] if either id is not live.
    /// - [`EcsError::SelfParent`], [`EcsError::MissingTransform`] or
    ///   [`EcsError::CycleDetected`] from the graph, with the hierarchy
    ///   unchanged.
    pub fn set_parent(&mut self, child: EntityId, parent: Option<EntityId>) -> EcsResult<()> {
        self.ensure_active()?;
        self.store.validate(child)?;
        if let Some(parent) = parent {
            self.store.validate(parent)?;
        }
        if !self.store.has::<Transform>(child) {
            return Err(EcsError::MissingTransform(child));
        }
        self.store.storage_mut::<Transform>()?.set_parent(child, parent)
    }

    /// Makes `child` a root.
    ///
    /// # Errors
    ///
    /// - [`EcsError::WorldDisposed`] after disposal.
    /// - [`EcsError::InvalidEntity`] if `child` is not live.
    /// - [`EcsError::MissingTransform`] if it has no transform.
    pub fn detach(&mut self, child: EntityId) -> EcsResult<()> {
        self.set_parent(child, None)
    }

    /// Parent of `id` in the hierarchy.
    #[must_use]
    pub fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.store.get::<Transform>(id).and_then(Transform::parent)
    }

    /// Direct children of `id`, in attachment order.
    pub fn children(&self, id: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        let live = self.store.is_alive(id);
        self.store
            .storage::<Transform>()
            .filter(|_| live)
            .into_iter()
            .flat_map(move |transforms| transforms.children(id))
    }

    /// Fresh world TRS of `id`, computed from its ancestors without
    /// touching any cache.
    #[must_use]
    pub fn world_transform(&self, id: EntityId) -> Option<Trs> {
        if !self.store.is_alive(id) {
            return None;
        }
        self.store.storage::<Transform>()?.resolve_world(id)
    }

    /// Recomputes every dirty transform now instead of waiting for the
    /// propagation system. Returns the number recomputed.
    pub fn propagate_transforms(&mut self) -> usize {
        if self.disposed || self.store.storage::<Transform>().is_none() {
            return 0;
        }
        self.store
            .storage_mut::<Transform>()
            .map_or(0, |transforms| transforms.propagate())
    }

    // =========================================================================
    // Systems
    // =========================================================================

    /// Registers `system`; it is initialized before the next pass.
    ///
    /// # Errors
    ///
    /// - [`EcsError::WorldDisposed`] after disposal.
    /// - [`EcsError::DuplicateSystem`] if one of the same type exists.
    pub fn add_system<S: System>(&mut self, system: S) -> EcsResult<()> {
        self.ensure_active()?;
        self.scheduler.add(system)
    }

    /// Disposes and removes the system of type `S`, handing it back.
    ///
    /// # Errors
    ///
    /// - [`EcsError::WorldDisposed`] after disposal.
    /// - [`EcsError::SystemNotFound`] if none is registered.
    pub fn remove_system<S: System>(&mut self) -> EcsResult<S> {
        self.ensure_active()?;
        let (scheduler, mut ctx) = self.split();
        scheduler.remove::<S>(&mut ctx)
    }

    /// The system of type `S`.
    #[must_use]
    pub fn system<S: System>(&self) -> Option<&S> {
        self.scheduler.get::<S>()
    }

    /// The system of type `S`, mutably.
    pub fn system_mut<S: System>(&mut self) -> Option<&mut S> {
        self.scheduler.get_mut::<S>()
    }

    /// Enables or disables the system of type `S`.
    ///
    /// # Errors
    ///
    /// - [`EcsError::WorldDisposed`] after disposal.
    /// - [`EcsError::SystemNotFound`] if none is registered.
    pub fn set_system_enabled<S: System>(&mut self, enabled: bool) -> EcsResult<()> {
        self.ensure_active()?;
        self.scheduler.set_enabled::<S>(enabled)
    }

    /// Lifecycle state of the system of type `S`.
    #[must_use]
    pub fn system_state<S: System>(&self) -> Option<SystemState> {
        self.scheduler.state::<S>()
    }

    /// Run statistics of the system of type `S`.
    #[must_use]
    pub fn system_stats<S: System>(&self) -> Option<&SystemStats> {
        self.scheduler.stats::<S>()
    }

    /// Number of registered systems, built-ins included.
    #[must_use]
    pub fn system_count(&self) -> usize {
        self.scheduler.len()
    }

    // =========================================================================
    // Frame
    // =========================================================================

    fn clamp_delta(&self, dt: f32) -> f32 {
        if !dt.is_finite() || dt < 0.0 {
            tracing::warn!(dt, "invalid delta time, using 0");
            return 0.0;
        }
        dt.min(self.config.max_delta_time)
    }

    /// Runs one variable-step frame: engine-update signal, update hooks in
    /// priority order, commit, then deferred signals.
    ///
    /// `dt` is clamped to `max_delta_time`. A no-op after disposal.
    pub fn update(&mut self, dt: f32) {
        if self.disposed {
            return;
        }
        let dt = self.clamp_delta(dt);
        self.elapsed += f64::from(dt);
        self.signals.dispatch::<EngineUpdate>(&UpdateEvent {
            delta: dt,
            total_elapsed: self.elapsed,
        });

        let (scheduler, mut ctx) = self.split();
        scheduler.initialize_pending(&mut ctx);
        let ran = scheduler.run_update(&mut ctx, dt);

        let applied = self.commit();
        let drained = self.signals.drain_deferred();

        if self.config.debug {
            tracing::debug!(
                frame = self.frame,
                dt,
                systems = ran,
                commands = applied,
                deferred = drained,
                "frame complete"
            );
        }
        self.frame += 1;
    }

    /// Runs the fixed-step hooks once with `dt`, then commits.
    ///
    /// Independent of [`update`](Self::update); does not advance the frame
    /// counter. A no-op after disposal.
    pub fn fixed_update(&mut self, dt: f32) {
        if self.disposed {
            return;
        }
        let (scheduler, mut ctx) = self.split();
        scheduler.initialize_pending(&mut ctx);
        scheduler.run_fixed_update(&mut ctx, dt);
        self.commit();
    }

    /// Feeds `frame_dt` to the fixed-step clock, runs the fixed steps it
    /// yields, then one [`update`](Self::update). Returns the number of
    /// fixed steps run.
    pub fn tick(&mut self, frame_dt: f32) -> u32 {
        if self.disposed {
            return 0;
        }
        let frame_dt = self.clamp_delta(frame_dt);
        let steps = self.clock.advance(frame_dt);
        let step = self.clock.step();
        for _ in 0..steps {
            self.fixed_update(step);
        }
        self.update(frame_dt);
        steps
    }

    /// Applies every command queued so far, in FIFO order. Commands queued
    /// while applying wait for the next commit. Returns the number applied.
    pub fn commit(&mut self) -> usize {
        if self.disposed {
            return 0;
        }
        let batch = self.queue.take_batch();
        let count = batch.len();
        for command in batch {
            self.apply(command);
        }
        count
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Spawn(id) => {
                if self.store.admit(id) {
                    tracing::trace!(entity = %id, "spawn applied");
                    self.signals.dispatch::<EntityCreated>(&id);
                } else {
                    tracing::warn!(entity = %id, "reserved id no longer current, spawn skipped");
                }
            }
            Command::Destroy(id) => match self.destroy_now(id) {
                Ok(()) => tracing::trace!(entity = %id, "destroy applied"),
                Err(err) => tracing::warn!(entity = %id, %err, "destroy skipped"),
            },
            Command::Component {
                entity,
                component,
                op,
                apply,
            } => {
                if let Err(err) = apply(self) {
                    tracing::warn!(%entity, component, op, %err, "component command skipped");
                }
            }
        }
    }

    /// A producer for the mutation queue, usable from any thread.
    #[must_use]
    pub fn commands(&self) -> CommandSender {
        self.sender.clone()
    }

    /// Commands waiting for the next commit.
    #[must_use]
    pub fn pending_commands(&self) -> usize {
        self.queue.len()
    }

    // =========================================================================
    // Scenes
    // =========================================================================

    /// Makes `name` the active scene and dispatches scene-changed.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::WorldDisposed`] after disposal.
    pub fn set_scene(&mut self, name: impl Into<String>) -> EcsResult<()> {
        self.ensure_active()?;
        let current = name.into();
        let previous = self.scene.replace(current.clone());
        tracing::info!(scene = %current, "scene changed");
        self.signals
            .dispatch::<SceneChanged>(&SceneChange { previous, current });
        Ok(())
    }

    /// The active scene.
    #[must_use]
    pub fn scene(&self) -> Option<&str> {
        self.scene.as_deref()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Bookkeeping snapshot.
    #[must_use]
    pub fn stats(&self) -> WorldStats {
        let pool = self.store.pool();
        WorldStats {
            entity_count: self.store.entity_count(),
            entity_capacity: pool.capacity(),
            max_entities: pool.max_entities(),
            system_count: self.scheduler.len(),
            enabled_systems: self.scheduler.enabled_count(),
            system_faults: self.scheduler.fault_count(),
            component_types: self.store.registry().len(),
            pending_commands: self.queue.len(),
            signal_channels: self.signals.channel_count(),
            listeners: self.signals.listener_count(),
            frame: self.frame,
            elapsed: self.elapsed,
            scene: self.scene.clone(),
            disposed: self.disposed,
        }
    }

    /// Tears the world down: destroys every entity (dispatching
    /// entity-destroyed for each), disposes systems in run order,
    /// dispatches engine-stopped and drops every listener.
    ///
    /// Afterwards `update`, `fixed_update` and `tick` do nothing and
    /// mutating calls return [`EcsError::WorldDisposed`]. Idempotent.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        let discarded = self.queue.discard();

        let ids: Vec<EntityId> = self.store.entities().collect();
        let destroyed = ids.len();
        for id in ids {
            if let Err(err) = self.destroy_now(id) {
                tracing::warn!(entity = %id, %err, "destroy failed during dispose");
            }
        }

        let (scheduler, mut ctx) = self.split();
        scheduler.dispose_all(&mut ctx);
        let discarded = discarded + self.queue.discard();

        self.signals.dispatch::<EngineStopped>(&());
        self.signals.clear_listeners();
        self.disposed = true;

        tracing::info!(
            frame = self.frame,
            destroyed,
            discarded,
            "world disposed"
        );
    }
}
