//! # Mutation Queue
//!
//! Structural changes (spawn, destroy, insert, remove) requested while a
//! pass is running, or from any other thread, are queued here and applied
//! by the world at its commit point, in FIFO order.
//!
//! The queue is an unbounded `crossbeam-channel`; [`CommandSender`] is the
//! cloneable producer handed to systems and loader threads.

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};

use super::component::Component;
use super::entity::EntityId;
use super::pool::IdentityPool;
use crate::error::EcsResult;
use crate::world::World;

/// Deferred component mutation, applied against the world at commit.
type Apply = Box<dyn FnOnce(&mut World) -> EcsResult<()> + Send>;

/// A queued structural change.
pub(crate) enum Command {
    /// Make a reserved identifier live.
    Spawn(EntityId),
    /// Destroy an entity and all of its components.
    Destroy(EntityId),
    /// Attach or detach one component.
    Component {
        entity: EntityId,
        component: &'static str,
        op: &'static str,
        apply: Apply,
    },
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn(id) => write!(f, "Spawn({id})"),
            Self::Destroy(id) => write!(f, "Destroy({id})"),
            Self::Component {
                entity,
                component,
                op,
                ..
            } => write!(f, "{op}({entity}, {component})"),
        }
    }
}

/// Thread-safe producer side of the mutation queue.
///
/// # Example
///
/// ```rust
/// use strata_core::World;
/// use strata_core::ecs::Name;
///
/// let mut world = World::with_defaults();
/// let commands = world.commands();
///
/// let loader = std::thread::spawn(move || {
///     let id = commands.spawn();
///     commands.insert(id, Name::new("loaded"));
///     id
/// });
/// let id = loader.join().unwrap();
///
/// assert!(!world.is_alive(id));
/// world.commit();
/// assert_eq!(world.get::<Name>(id).map(Name::as_str), Some("loaded"));
/// ```
#[derive(Clone)]
pub struct CommandSender {
    tx: Sender<Command>,
    pool: Arc<IdentityPool>,
}

impl fmt::Debug for CommandSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSender")
            .field("pending", &self.tx.len())
            .finish_non_exhaustive()
    }
}

impl CommandSender {
    /// Reserves an identifier now; the entity becomes live at the next
    /// commit.
    ///
    /// # Panics
    ///
    /// Panics when the identity pool is exhausted.
    #[must_use]
    pub fn spawn(&self) -> EntityId {
        let id = self.pool.acquire();
        self.push(Command::Spawn(id));
        id
    }

    /// Queues destruction of `id`.
    pub fn destroy(&self, id: EntityId) {
        self.push(Command::Destroy(id));
    }

    /// Queues attaching `component` to `id`.
    pub fn insert<C: Component>(&self, id: EntityId, component: C) {
        self.push(Command::Component {
            entity: id,
            component: type_name::<C>(),
            op: "Insert",
            apply: Box::new(move |world: &mut World| world.insert(id, component).map(drop)),
        });
    }

    /// Queues detaching the `C` of `id`.
    pub fn remove<C: Component>(&self, id: EntityId) {
        self.push(Command::Component {
            entity: id,
            component: type_name::<C>(),
            op: "Remove",
            apply: Box::new(move |world: &mut World| world.remove::<C>(id).map(drop)),
        });
    }

    /// Number of commands waiting for the next commit.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tx.len()
    }

    fn push(&self, command: Command) {
        if let Err(err) = self.tx.send(command) {
            tracing::warn!(command = ?err.0, "world dropped, command discarded");
        }
    }
}

/// Consumer side of the mutation queue, owned by the world.
#[derive(Debug)]
pub(crate) struct CommandQueue {
    tx: Sender<Command>,
    rx: Receiver<Command>,
}

impl CommandQueue {
    pub(crate) fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    pub(crate) fn sender(&self, pool: Arc<IdentityPool>) -> CommandSender {
        CommandSender {
            tx: self.tx.clone(),
            pool,
        }
    }

    /// Takes the commands queued so far. Commands queued while the batch is
    /// being applied wait for the next commit.
    pub(crate) fn take_batch(&self) -> Vec<Command> {
        let queued = self.rx.len();
        self.rx.try_iter().take(queued).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.rx.len()
    }

    /// Drops everything still queued.
    pub(crate) fn discard(&self) -> usize {
        self.rx.try_iter().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let pool = Arc::new(IdentityPool::new(8, 100));
        let queue = CommandQueue::new();
        let sender = queue.sender(Arc::clone(&pool));

        let a = sender.spawn();
        sender.destroy(a);
        let b = sender.spawn();

        let batch = queue.take_batch();
        assert_eq!(batch.len(), 3);
        assert!(matches!(batch[0], Command::Spawn(id) if id == a));
        assert!(matches!(batch[1], Command::Destroy(id) if id == a));
        assert!(matches!(batch[2], Command::Spawn(id) if id == b));
    }

    #[test]
    fn test_spawn_reserves_immediately() {
        let pool = Arc::new(IdentityPool::new(8, 100));
        let queue = CommandQueue::new();
        let sender = queue.sender(Arc::clone(&pool));

        let id = sender.spawn();
        assert!(pool.is_current(id));
        assert_eq!(sender.pending(), 1);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_sender_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CommandSender>();
    }

    #[test]
    fn test_discard() {
        let pool = Arc::new(IdentityPool::new(8, 100));
        let queue = CommandQueue::new();
        let sender = queue.sender(pool);
        sender.destroy(EntityId::new(0, 0));
        sender.destroy(EntityId::new(1, 0));
        assert_eq!(queue.discard(), 2);
        assert_eq!(queue.len(), 0);
    }
}
