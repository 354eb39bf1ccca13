//! # Identity Pool
//!
//! Issues and recycles entity identifiers.
//!
//! - Released indices are reused LIFO, so recently freed slots stay warm
//!   and the generation table grows only when the free list is empty.
//! - The generation of a slot is bumped on **release**, so every id issued
//!   before the release is dead for good.
//! - A slot whose generation would wrap is retired instead of recycled.
//!
//! The pool is shared (`Arc<IdentityPool>`) between the world and every
//! [`CommandSender`](super::CommandSender), so acquire/release are guarded
//! by a single mutex.

use parking_lot::Mutex;

use super::entity::EntityId;
use crate::error::{EcsError, EcsResult};

/// Mutable pool state, guarded by the pool mutex.
#[derive(Debug)]
struct PoolState {
    /// Current generation of every slot ever handed out.
    generations: Vec<u32>,
    /// Whether the slot is currently issued.
    live: Vec<bool>,
    /// Released indices, popped from the back (LIFO).
    free: Vec<u32>,
    /// Slots that can never be reissued.
    retired: usize,
}

/// Thread-safe generational id allocator.
///
/// # Example
///
/// ```rust
/// use strata_core::ecs::IdentityPool;
///
/// let pool = IdentityPool::new(16, 1024);
/// let a = pool.acquire();
/// assert!(pool.is_current(a));
///
/// pool.release(a).unwrap();
/// assert!(!pool.is_current(a));
///
/// let b = pool.acquire();
/// assert_eq!(a.index(), b.index());
/// assert!(!pool.is_current(a));
/// ```
#[derive(Debug)]
pub struct IdentityPool {
    state: Mutex<PoolState>,
    max_entities: usize,
}

impl IdentityPool {
    /// Creates a pool with `initial_capacity` reserved slots and a hard
    /// limit of `max_entities` distinct indices.
    ///
    /// # Panics
    ///
    /// Panics if `max_entities` is zero.
    #[must_use]
    pub fn new(initial_capacity: usize, max_entities: usize) -> Self {
        assert!(max_entities > 0, "max_entities must be greater than zero");
        let max_entities = max_entities.min(EntityId::MAX_INDEX as usize + 1);
        let reserve = initial_capacity.min(max_entities);

        Self {
            state: Mutex::new(PoolState {
                generations: Vec::with_capacity(reserve),
                live: Vec::with_capacity(reserve),
                free: Vec::with_capacity(reserve / 4),
                retired: 0,
            }),
            max_entities,
        }
    }

    /// Hard limit on distinct indices.
    #[inline]
    #[must_use]
    pub const fn max_entities(&self) -> usize {
        self.max_entities
    }

    /// Acquires a fresh identifier.
    ///
    /// # Panics
    ///
    /// Panics when every addressable index is in use. Running out of
    /// identity space is unrecoverable for the world.
    #[must_use]
    pub fn acquire(&self) -> EntityId {
        match self.try_acquire() {
            Ok(id) => id,
            Err(err) => {
                tracing::error!(%err, "identity pool exhausted");
                panic!("{err}");
            }
        }
    }

    /// Acquires a fresh identifier, reporting exhaustion as an error.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::CapacityExhausted`] when no index is free and the
    /// pool has reached `max_entities`.
    pub fn try_acquire(&self) -> EcsResult<EntityId> {
        let mut state = self.state.lock();

        if let Some(index) = state.free.pop() {
            let slot = index as usize;
            state.live[slot] = true;
            return Ok(EntityId::new(index, state.generations[slot]));
        }

        let next = state.generations.len();
        if next >= self.max_entities {
            return Err(EcsError::CapacityExhausted {
                resource: "entity index",
                limit: self.max_entities,
            });
        }

        state.generations.push(0);
        state.live.push(true);
        Ok(EntityId::new(next as u32, 0))
    }

    /// Releases an identifier, invalidating it and every copy of it.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidEntity`] if the id is null, out of range,
    /// or no longer current.
    pub fn release(&self, id: EntityId) -> EcsResult<()> {
        let mut state = self.state.lock();
        let slot = id.slot();

        let current = !id.is_null()
            && state.live.get(slot).copied().unwrap_or(false)
            && state.generations[slot] == id.generation();
        if !current {
            return Err(EcsError::InvalidEntity(id));
        }

        state.live[slot] = false;
        if id.generation() == u32::MAX {
            // Wrapping would re-validate id.generation() == 0.
            state.retired += 1;
            tracing::debug!(entity = %id, "retiring exhausted slot");
        } else {
            state.generations[slot] = id.generation() + 1;
            state.free.push(id.index());
        }
        Ok(())
    }

    /// Checks whether `id` is the live identifier for its index.
    #[must_use]
    pub fn is_current(&self, id: EntityId) -> bool {
        if id.is_null() {
            return false;
        }
        let state = self.state.lock();
        let slot = id.slot();
        state.live.get(slot).copied().unwrap_or(false) && state.generations[slot] == id.generation()
    }

    /// Current generation of a slot, or `None` if the index was never issued.
    #[must_use]
    pub fn current_generation(&self, index: u32) -> Option<u32> {
        self.state.lock().generations.get(index as usize).copied()
    }

    /// Number of identifiers currently issued.
    #[must_use]
    pub fn live_count(&self) -> usize {
        let state = self.state.lock();
        state.generations.len() - state.free.len() - state.retired
    }

    /// Number of released indices waiting for reuse.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.state.lock().free.len()
    }

    /// Number of slots ever allocated (live, free, or retired).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.state.lock().generations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_acquire_allocates_sequentially() {
        let pool = IdentityPool::new(4, 100);
        let a = pool.acquire();
        let b = pool.acquire();
        assert_eq!((a.index(), a.generation()), (0, 0));
        assert_eq!((b.index(), b.generation()), (1, 0));
        assert_eq!(pool.live_count(), 2);
    }

    #[test]
    fn test_release_invalidates_forever() {
        let pool = IdentityPool::new(4, 100);
        let old = pool.acquire();
        pool.release(old).unwrap();
        assert!(!pool.is_current(old));

        let reused = pool.acquire();
        assert_eq!(reused.index(), old.index());
        assert_eq!(reused.generation(), old.generation() + 1);
        assert!(pool.is_current(reused));
        assert!(!pool.is_current(old));
    }

    #[test]
    fn test_lifo_reuse() {
        let pool = IdentityPool::new(4, 100);
        let ids: Vec<_> = (0..3).map(|_| pool.acquire()).collect();
        pool.release(ids[0]).unwrap();
        pool.release(ids[2]).unwrap();

        assert_eq!(pool.acquire().index(), 2);
        assert_eq!(pool.acquire().index(), 0);
        assert_eq!(pool.acquire().index(), 3);
    }

    #[test]
    fn test_double_release_rejected() {
        let pool = IdentityPool::new(4, 100);
        let id = pool.acquire();
        pool.release(id).unwrap();
        assert_eq!(pool.release(id), Err(EcsError::InvalidEntity(id)));
        assert_eq!(pool.free_count(), 1);
    }

    #[test]
    fn test_out_of_range_and_null() {
        let pool = IdentityPool::new(4, 100);
        assert!(!pool.is_current(EntityId::new(50, 0)));
        assert!(!pool.is_current(EntityId::NULL));
        assert!(pool.release(EntityId::new(50, 0)).is_err());
    }

    #[test]
    fn test_exhaustion() {
        let pool = IdentityPool::new(2, 2);
        let _a = pool.acquire();
        let b = pool.acquire();
        assert!(matches!(
            pool.try_acquire(),
            Err(EcsError::CapacityExhausted { limit: 2, .. })
        ));

        pool.release(b).unwrap();
        assert!(pool.try_acquire().is_ok());
    }

    #[test]
    #[should_panic(expected = "capacity exhausted")]
    fn test_acquire_panics_when_exhausted() {
        let pool = IdentityPool::new(1, 1);
        let _a = pool.acquire();
        let _b = pool.acquire();
    }

    #[test]
    fn test_exhausted_generation_retires_slot() {
        let pool = IdentityPool::new(4, 100);
        let worn = pool.acquire();
        let other = pool.acquire();
        pool.state.lock().generations[worn.slot()] = u32::MAX;
        let worn = EntityId::new(worn.index(), u32::MAX);
        assert!(pool.is_current(worn));

        pool.release(worn).unwrap();
        assert!(!pool.is_current(worn));
        assert!(!pool.is_current(EntityId::new(worn.index(), 0)));
        assert_eq!(pool.free_count(), 0);
        assert_eq!(pool.live_count(), 1);

        let next = pool.acquire();
        assert_ne!(next.index(), worn.index());
        assert_eq!(next.index(), 2);
        assert_eq!(pool.live_count(), 2);
        assert_eq!(pool.release(worn), Err(EcsError::InvalidEntity(worn)));

        pool.release(other).unwrap();
        assert_eq!(pool.acquire().index(), other.index());
        assert_eq!(pool.capacity(), 3);
    }

    #[test]
    fn test_concurrent_acquire_release() {
        let pool = Arc::new(IdentityPool::new(64, 100_000));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    let mut kept = Vec::new();
                    for i in 0..1_000 {
                        let id = pool.acquire();
                        if i % 2 == 0 {
                            pool.release(id).unwrap();
                        } else {
                            kept.push(id);
                        }
                    }
                    kept
                })
            })
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(pool.is_current(id));
                assert!(all.insert(id.index()), "index issued twice");
            }
        }
        assert_eq!(pool.live_count(), 8 * 500);
    }
}
