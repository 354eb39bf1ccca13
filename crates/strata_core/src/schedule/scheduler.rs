//! # System Scheduler
//!
//! Holds the world's systems in run order and drives their hooks.
//!
//! ## Ordering
//!
//! Systems are kept sorted by `(priority, registration sequence)`. Lower
//! priorities run first and systems sharing a priority run in the order
//! they were added, independent of anything else.
//!
//! ## Fault Containment
//!
//! A hook that returns `Err` or panics is logged at `error`, counted in
//! its [`SystemStats`], and the pass moves on to the next system.

use std::any::{type_name, TypeId};
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use super::system::{System, SystemContext, SystemObject, SystemState, SystemStats};
use crate::error::{EcsError, EcsResult, SystemError, SystemResult};
use crate::signal::panic_message;

/// Which hook a pass runs.
#[derive(Clone, Copy, Debug)]
enum Hook {
    Initialize,
    Update(f32),
    FixedUpdate(f32),
    Dispose,
}

impl Hook {
    const fn label(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Update(_) => "update",
            Self::FixedUpdate(_) => "fixed_update",
            Self::Dispose => "dispose",
        }
    }
}

struct Entry {
    type_id: TypeId,
    name: &'static str,
    priority: i32,
    sequence: u64,
    state: SystemState,
    /// Whether `initialize` has completed successfully.
    initialized: bool,
    /// State to enter once initialization succeeds.
    enable_on_init: bool,
    stats: SystemStats,
    system: Box<dyn SystemObject>,
}

impl Entry {
    /// Runs one hook, containing errors and panics. Returns `true` on success.
    fn run(&mut self, hook: Hook, ctx: &mut SystemContext<'_>) -> bool {
        let started = Instant::now();
        let system = &mut self.system;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> SystemResult {
            match hook {
                Hook::Initialize => system.initialize(ctx),
                Hook::Update(dt) => system.update(ctx, dt),
                Hook::FixedUpdate(dt) => system.fixed_update(ctx, dt),
                Hook::Dispose => system.dispose(ctx),
            }
        }));
        let elapsed = started.elapsed();

        if matches!(hook, Hook::Update(_) | Hook::FixedUpdate(_)) {
            self.stats.runs += 1;
            self.stats.last_duration = elapsed;
            self.stats.total_duration += elapsed;
        }

        let error = match outcome {
            Ok(Ok(())) => return true,
            Ok(Err(err)) => err,
            Err(payload) => SystemError::failed(format!(
                "panicked: {}",
                panic_message(payload.as_ref())
            )),
        };
        self.stats.faults += 1;
        tracing::error!(
            system = self.name,
            hook = hook.label(),
            frame = ctx.frame(),
            %error,
            "system hook failed"
        );
        false
    }
}

/// Priority-ordered collection of systems.
#[derive(Default)]
pub struct Scheduler {
    entries: Vec<Entry>,
    next_sequence: u64,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("systems", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

impl Scheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `system`. It is initialized before the next pass.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::DuplicateSystem`] if a system of the same type is
    /// already registered.
    pub fn add<S: System>(&mut self, system: S) -> EcsResult<()> {
        if self.position::<S>().is_some() {
            return Err(EcsError::DuplicateSystem(type_name::<S>()));
        }

        let entry = Entry {
            type_id: TypeId::of::<S>(),
            name: system.name(),
            priority: system.priority(),
            sequence: self.next_sequence,
            state: SystemState::Registered,
            initialized: false,
            enable_on_init: true,
            stats: SystemStats::default(),
            system: Box::new(system),
        };
        self.next_sequence += 1;
        tracing::debug!(system = entry.name, priority = entry.priority, "system registered");
        self.entries.push(entry);
        self.sort();
        Ok(())
    }

    /// Removes the system of type `S`, running its `dispose` hook first.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemNotFound`] if no such system is registered.
    pub fn remove<S: System>(&mut self, ctx: &mut SystemContext<'_>) -> EcsResult<S> {
        let pos = self
            .position::<S>()
            .ok_or(EcsError::SystemNotFound(type_name::<S>()))?;
        let mut entry = self.entries.remove(pos);
        if entry.state != SystemState::Disposed {
            entry.run(Hook::Dispose, ctx);
        }
        tracing::debug!(system = entry.name, "system removed");
        entry
            .system
            .into_any()
            .downcast::<S>()
            .map(|boxed| *boxed)
            .map_err(|_| EcsError::SystemNotFound(type_name::<S>()))
    }

    /// The system of type `S`.
    #[must_use]
    pub fn get<S: System>(&self) -> Option<&S> {
        let pos = self.position::<S>()?;
        self.entries[pos].system.as_any().downcast_ref()
    }

    /// The system of type `S`, mutably.
    pub fn get_mut<S: System>(&mut self) -> Option<&mut S> {
        let pos = self.position::<S>()?;
        self.entries[pos].system.as_any_mut().downcast_mut()
    }

    /// Whether a system of type `S` is registered.
    #[must_use]
    pub fn contains<S: System>(&self) -> bool {
        self.position::<S>().is_some()
    }

    /// Enables or disables the system of type `S`.
    ///
    /// Disabling a system that has not been initialized yet keeps it
    /// disabled after initialization. Enabling a system whose
    /// initialization failed schedules another attempt.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemNotFound`] if no such system is registered.
    pub fn set_enabled<S: System>(&mut self, enabled: bool) -> EcsResult<()> {
        let entry = self.entry_mut::<S>()?;
        entry.state = match (entry.state, entry.initialized, enabled) {
            (SystemState::Disposed, _, _) => SystemState::Disposed,
            (SystemState::Disabled, false, false) => SystemState::Disabled,
            (_, false, wanted) => {
                entry.enable_on_init = wanted;
                SystemState::Registered
            }
            (_, true, true) => SystemState::Enabled,
            (_, true, false) => SystemState::Disabled,
        };
        Ok(())
    }

    /// Changes the priority of the system of type `S` and re-sorts.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemNotFound`] if no such system is registered.
    pub fn set_priority<S: System>(&mut self, priority: i32) -> EcsResult<()> {
        self.entry_mut::<S>()?.priority = priority;
        self.sort();
        Ok(())
    }

    /// Lifecycle state of the system of type `S`.
    #[must_use]
    pub fn state<S: System>(&self) -> Option<SystemState> {
        self.position::<S>().map(|pos| self.entries[pos].state)
    }

    /// Statistics of the system of type `S`.
    #[must_use]
    pub fn stats<S: System>(&self) -> Option<&SystemStats> {
        self.position::<S>().map(|pos| &self.entries[pos].stats)
    }

    /// Priority of the system of type `S`.
    #[must_use]
    pub fn priority<S: System>(&self) -> Option<i32> {
        self.position::<S>().map(|pos| self.entries[pos].priority)
    }

    /// System names in run order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.name)
    }

    /// Number of registered systems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no system is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of systems currently enabled.
    #[must_use]
    pub fn enabled_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.state == SystemState::Enabled)
            .count()
    }

    /// Total faults across all systems.
    #[must_use]
    pub fn fault_count(&self) -> u64 {
        self.entries.iter().map(|e| e.stats.faults).sum()
    }

    /// Runs `initialize` on every system still in the registered state.
    ///
    /// A failed initialization leaves the system disabled.
    pub fn initialize_pending(&mut self, ctx: &mut SystemContext<'_>) {
        for entry in &mut self.entries {
            if entry.state != SystemState::Registered {
                continue;
            }
            if entry.run(Hook::Initialize, ctx) {
                entry.initialized = true;
                entry.state = if entry.enable_on_init {
                    SystemState::Enabled
                } else {
                    SystemState::Disabled
                };
                tracing::debug!(system = entry.name, "system initialized");
            } else {
                entry.state = SystemState::Disabled;
            }
        }
    }

    /// Runs the variable-step hook of every enabled system, in order.
    /// Returns the number of hooks that ran.
    pub fn run_update(&mut self, ctx: &mut SystemContext<'_>, dt: f32) -> usize {
        self.run_pass(Hook::Update(dt), ctx)
    }

    /// Runs the fixed-step hook of every enabled system, in order.
    /// Returns the number of hooks that ran.
    pub fn run_fixed_update(&mut self, ctx: &mut SystemContext<'_>, dt: f32) -> usize {
        self.run_pass(Hook::FixedUpdate(dt), ctx)
    }

    /// Disposes every system in run order. Systems stay listed in the
    /// disposed state.
    pub fn dispose_all(&mut self, ctx: &mut SystemContext<'_>) {
        for entry in &mut self.entries {
            if entry.state == SystemState::Disposed {
                continue;
            }
            entry.run(Hook::Dispose, ctx);
            entry.state = SystemState::Disposed;
            tracing::debug!(system = entry.name, "system disposed");
        }
    }

    fn run_pass(&mut self, hook: Hook, ctx: &mut SystemContext<'_>) -> usize {
        let mut ran = 0;
        for entry in &mut self.entries {
            if entry.state == SystemState::Enabled {
                entry.run(hook, ctx);
                ran += 1;
            }
        }
        ran
    }

    fn sort(&mut self) {
        self.entries.sort_by_key(|e| (e.priority, e.sequence));
    }

    fn position<S: System>(&self) -> Option<usize> {
        let id = TypeId::of::<S>();
        self.entries.iter().position(|e| e.type_id == id)
    }

    fn entry_mut<S: System>(&mut self) -> EcsResult<&mut Entry> {
        let pos = self
            .position::<S>()
            .ok_or(EcsError::SystemNotFound(type_name::<S>()))?;
        Ok(&mut self.entries[pos])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{CommandQueue, ComponentStore, IdentityPool, StoragePolicy};
    use crate::signal::SignalRegistry;
    use parking_lot::Mutex;
    use std::sync::Arc;

    type Log = Arc<Mutex<Vec<&'static str>>>;

    struct Harness {
        store: ComponentStore,
        signals: SignalRegistry,
        commands: crate::ecs::CommandSender,
        _queue: CommandQueue,
    }

    impl Harness {
        fn new() -> Self {
            let pool = Arc::new(IdentityPool::new(8, 1_000));
            let queue = CommandQueue::new();
            Self {
                store: ComponentStore::new(Arc::clone(&pool), StoragePolicy::default()),
                signals: SignalRegistry::new(),
                commands: queue.sender(pool),
                _queue: queue,
            }
        }

        fn ctx(&mut self) -> SystemContext<'_> {
            SystemContext::new(&mut self.store, &self.signals, &self.commands, 0, 0.0)
        }
    }

    struct Recorder {
        tag: &'static str,
        priority: i32,
        log: Log,
    }

    impl System for Recorder {
        fn priority(&self) -> i32 {
            self.priority
        }

        fn update(&mut self, _ctx: &mut SystemContext<'_>, _dt: f32) -> SystemResult {
            self.log.lock().push(self.tag);
            Ok(())
        }
    }

    struct Other(Log);

    impl System for Other {
        fn update(&mut self, _ctx: &mut SystemContext<'_>, _dt: f32) -> SystemResult {
            self.0.lock().push("other");
            Ok(())
        }
    }

    struct Faulty;

    impl System for Faulty {
        fn priority(&self) -> i32 {
            -1
        }

        fn update(&mut self, _ctx: &mut SystemContext<'_>, _dt: f32) -> SystemResult {
            Err(SystemError::failed("boom"))
        }

        fn fixed_update(&mut self, _ctx: &mut SystemContext<'_>, _dt: f32) -> SystemResult {
            panic!("fixed boom");
        }
    }

    struct FailsInit;

    impl System for FailsInit {
        fn initialize(&mut self, _ctx: &mut SystemContext<'_>) -> SystemResult {
            Err(SystemError::failed("no resources"))
        }
    }

    #[test]
    fn test_priority_order_and_tiebreak() {
        let log = Log::default();
        let mut scheduler = Scheduler::new();
        scheduler
            .add(Recorder { tag: "normal", priority: 0, log: Arc::clone(&log) })
            .unwrap();
        scheduler.add(Other(Arc::clone(&log))).unwrap();
        scheduler.add(Faulty).unwrap();

        let mut h = Harness::new();
        let mut ctx = h.ctx();
        scheduler.initialize_pending(&mut ctx);
        scheduler.run_update(&mut ctx, 0.016);

        // Faulty (-1) first, then the two priority-0 systems in registration order.
        assert_eq!(*log.lock(), vec!["normal", "other"]);
        let names: Vec<_> = scheduler.names().collect();
        assert!(names[0].ends_with("Faulty"));
        assert!(names[1].ends_with("Recorder"));
    }

    #[test]
    fn test_duplicate_type_rejected() {
        let mut scheduler = Scheduler::new();
        scheduler.add(Faulty).unwrap();
        assert!(matches!(
            scheduler.add(Faulty),
            Err(EcsError::DuplicateSystem(_))
        ));
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn test_faults_are_contained() {
        let log = Log::default();
        let mut scheduler = Scheduler::new();
        scheduler.add(Faulty).unwrap();
        scheduler.add(Other(Arc::clone(&log))).unwrap();

        let mut h = Harness::new();
        let mut ctx = h.ctx();
        scheduler.initialize_pending(&mut ctx);
        assert_eq!(scheduler.run_update(&mut ctx, 0.1), 2);
        assert_eq!(scheduler.run_fixed_update(&mut ctx, 0.1), 2);
        scheduler.run_update(&mut ctx, 0.1);

        assert_eq!(log.lock().len(), 2);
        let stats = scheduler.stats::<Faulty>().unwrap();
        assert_eq!(stats.faults, 3);
        assert_eq!(stats.runs, 3);
        assert_eq!(scheduler.state::<Faulty>(), Some(SystemState::Enabled));
    }

    #[test]
    fn test_failed_initialize_disables() {
        let mut scheduler = Scheduler::new();
        scheduler.add(FailsInit).unwrap();
        assert_eq!(scheduler.state::<FailsInit>(), Some(SystemState::Registered));

        let mut h = Harness::new();
        let mut ctx = h.ctx();
        scheduler.initialize_pending(&mut ctx);
        assert_eq!(scheduler.state::<FailsInit>(), Some(SystemState::Disabled));
        assert_eq!(scheduler.run_update(&mut ctx, 0.1), 0);

        scheduler.set_enabled::<FailsInit>(true).unwrap();
        assert_eq!(scheduler.state::<FailsInit>(), Some(SystemState::Registered));
    }

    #[test]
    fn test_enable_disable() {
        let log = Log::default();
        let mut scheduler = Scheduler::new();
        scheduler.add(Other(Arc::clone(&log))).unwrap();
        scheduler.set_enabled::<Other>(false).unwrap();

        let mut h = Harness::new();
        let mut ctx = h.ctx();
        scheduler.initialize_pending(&mut ctx);
        assert_eq!(scheduler.state::<Other>(), Some(SystemState::Disabled));
        scheduler.run_update(&mut ctx, 0.1);
        assert!(log.lock().is_empty());

        scheduler.set_enabled::<Other>(true).unwrap();
        scheduler.run_update(&mut ctx, 0.1);
        assert_eq!(log.lock().len(), 1);
        assert!(scheduler.set_enabled::<Faulty>(true).is_err());
    }

    #[test]
    fn test_set_priority_resorts() {
        let log = Log::default();
        let mut scheduler = Scheduler::new();
        scheduler
            .add(Recorder { tag: "recorder", priority: 0, log: Arc::clone(&log) })
            .unwrap();
        scheduler.add(Other(Arc::clone(&log))).unwrap();
        scheduler.set_priority::<Other>(-5).unwrap();

        let mut h = Harness::new();
        let mut ctx = h.ctx();
        scheduler.initialize_pending(&mut ctx);
        scheduler.run_update(&mut ctx, 0.1);
        assert_eq!(*log.lock(), vec!["other", "recorder"]);
        assert_eq!(scheduler.priority::<Other>(), Some(-5));
    }

    #[test]
    fn test_remove_returns_system() {
        let mut scheduler = Scheduler::new();
        scheduler.add(Faulty).unwrap();
        let mut h = Harness::new();
        let mut ctx = h.ctx();
        let _faulty: Faulty = scheduler.remove::<Faulty>(&mut ctx).unwrap();
        assert!(scheduler.is_empty());
        assert!(matches!(
            scheduler.remove::<Faulty>(&mut ctx),
            Err(EcsError::SystemNotFound(_))
        ));
    }

    #[test]
    fn test_dispose_all() {
        let mut scheduler = Scheduler::new();
        scheduler.add(Faulty).unwrap();
        let mut h = Harness::new();
        let mut ctx = h.ctx();
        scheduler.initialize_pending(&mut ctx);
        scheduler.dispose_all(&mut ctx);
        assert_eq!(scheduler.state::<Faulty>(), Some(SystemState::Disposed));
        assert_eq!(scheduler.run_update(&mut ctx, 0.1), 0);

        scheduler.set_enabled::<Faulty>(true).unwrap();
        assert_eq!(scheduler.state::<Faulty>(), Some(SystemState::Disposed));
    }
}
