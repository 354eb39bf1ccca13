//! # Component Store
//!
//! Owns every component storage of a world together with the set of live
//! entities.
//!
//! ## Queries
//!
//! A [`TypeSet`] is built once (usually at system initialization) and
//! reused every frame. [`ComponentStore::for_each_with`] walks the alive
//! bitset one 64-bit block at a time, ANDing in the presence block of
//! every queried type, so a query never allocates.
//!
//! ## Structural Changes
//!
//! Spawning, despawning, inserting and removing are crate-internal. The
//! world calls them directly outside a pass and at the commit point, where
//! it also keeps the transform hierarchy consistent. Code holding a
//! `&mut ComponentStore` from outside the crate can only edit components
//! in place.

use std::any::type_name;
use std::sync::Arc;

use super::bitset::{BitIter, EntityBitset};
use super::component::{Component, ComponentRegistry, ComponentTypeId};
use super::entity::EntityId;
use super::pool::IdentityPool;
use super::storage::{ComponentStorage, ErasedStorage, DEFAULT_GROWTH_FACTOR};
use crate::error::{EcsError, EcsResult};

/// Storage policy applied to every storage the store creates.
#[derive(Debug, Clone, Copy)]
pub struct StoragePolicy {
    /// Initial slot count of a new storage.
    pub initial_capacity: usize,
    /// Growth multiplier, greater than 1.
    pub growth_factor: f32,
    /// Maximum recycled instances kept per type.
    pub recycle_limit: usize,
}

impl Default for StoragePolicy {
    fn default() -> Self {
        Self {
            initial_capacity: 1_000,
            growth_factor: DEFAULT_GROWTH_FACTOR,
            recycle_limit: 64,
        }
    }
}

/// All component data of one world.
pub struct ComponentStore {
    registry: ComponentRegistry,
    /// Storage per component type id, created on first insert.
    storages: Vec<Option<Box<dyn ErasedStorage>>>,
    /// Indices of live entities.
    alive: EntityBitset,
    /// Live identifier per index (`NULL` when the index is not live).
    live: Vec<EntityId>,
    pool: Arc<IdentityPool>,
    policy: StoragePolicy,
}

impl std::fmt::Debug for ComponentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentStore")
            .field("entities", &self.alive.len())
            .field("component_types", &self.registry.len())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ComponentStore {
    /// Creates an empty store drawing identifiers from `pool`.
    #[must_use]
    pub fn new(pool: Arc<IdentityPool>, policy: StoragePolicy) -> Self {
        Self {
            registry: ComponentRegistry::new(),
            storages: Vec::new(),
            alive: EntityBitset::new(),
            live: Vec::new(),
            pool,
            policy,
        }
    }

    /// The shared identity pool.
    #[inline]
    #[must_use]
    pub fn pool(&self) -> &Arc<IdentityPool> {
        &self.pool
    }

    /// The component type registry.
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// The component type registry, mutably (for registration and sealing).
    #[inline]
    pub fn registry_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.registry
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Acquires a new identifier and marks it live.
    pub(crate) fn spawn(&mut self) -> EntityId {
        let id = self.pool.acquire();
        self.admit(id);
        id
    }

    /// Marks an identifier reserved from the pool as live.
    ///
    /// Returns `false` (and does nothing) if the pool no longer considers
    /// `id` current.
    pub(crate) fn admit(&mut self, id: EntityId) -> bool {
        if !self.pool.is_current(id) {
            return false;
        }
        let slot = id.slot();
        if slot >= self.live.len() {
            self.live.resize(slot + 1, EntityId::NULL);
        }
        self.live[slot] = id;
        self.alive.insert(id.index());
        true
    }

    /// Removes every component of `id` and releases the identifier.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidEntity`] if `id` is not live.
    pub(crate) fn despawn(&mut self, id: EntityId) -> EcsResult<()> {
        self.validate(id)?;
        let index = id.index();
        for storage in self.storages.iter_mut().flatten() {
            storage.discard(index);
        }
        self.alive.remove(index);
        self.live[id.slot()] = EntityId::NULL;
        self.pool.release(id)
    }

    /// Whether `id` is live in this store.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.live.get(id.slot()).is_some_and(|&live| live == id) && !id.is_null()
    }

    /// Fails with [`EcsError::InvalidEntity`] unless `id` is live.
    ///
    /// # Errors
    ///
    /// See above.
    #[inline]
    pub fn validate(&self, id: EntityId) -> EcsResult<()> {
        if self.is_alive(id) {
            Ok(())
        } else {
            Err(EcsError::InvalidEntity(id))
        }
    }

    /// Number of live entities.
    #[inline]
    #[must_use]
    pub const fn entity_count(&self) -> usize {
        self.alive.len()
    }

    /// Live entities in ascending index order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.alive.iter().map(|index| self.live[index as usize])
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Attaches `component` to `id`, returning the value it replaced.
    ///
    /// The type is registered on first use.
    ///
    /// # Errors
    ///
    /// - [`EcsError::InvalidEntity`] if `id` is not live.
    /// - [`EcsError::RegistrySealed`] if `C` is new and the registry is sealed.
    pub(crate) fn insert<C: Component>(&mut self, id: EntityId, component: C) -> EcsResult<Option<C>> {
        self.validate(id)?;
        let storage = self.storage_mut::<C>()?;
        Ok(storage.set(id.index(), component))
    }

    /// Gets the `C` of `id`. Stale ids and unknown types are absent.
    #[must_use]
    pub fn get<C: Component>(&self, id: EntityId) -> Option<&C> {
        if !self.is_alive(id) {
            return None;
        }
        self.storage::<C>()?.get(id.index())
    }

    /// Gets the `C` of `id` mutably.
    pub fn get_mut<C: Component>(&mut self, id: EntityId) -> Option<&mut C> {
        if !self.is_alive(id) {
            return None;
        }
        self.existing_storage_mut::<C>()?.get_mut(id.index())
    }

    /// Detaches and returns the `C` of `id`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidEntity`] if `id` is not live.
    pub(crate) fn remove<C: Component>(&mut self, id: EntityId) -> EcsResult<Option<C>> {
        self.validate(id)?;
        Ok(self
            .existing_storage_mut::<C>()
            .and_then(|storage| storage.remove(id.index())))
    }

    /// Whether `id` is live and holds a `C`.
    #[must_use]
    pub fn has<C: Component>(&self, id: EntityId) -> bool {
        self.is_alive(id) && self.storage::<C>().is_some_and(|s| s.has(id.index()))
    }

    /// Number of components attached to `id`.
    #[must_use]
    pub fn component_count(&self, id: EntityId) -> usize {
        if !self.is_alive(id) {
            return 0;
        }
        self.storages
            .iter()
            .flatten()
            .filter(|storage| storage.has(id.index()))
            .count()
    }

    /// Types of every component attached to `id`, in registration order.
    /// Empty for stale ids.
    pub fn component_types(&self, id: EntityId) -> impl Iterator<Item = ComponentTypeId> + '_ {
        let alive = self.is_alive(id);
        let index = id.index();
        self.storages
            .iter()
            .enumerate()
            .filter(move |(_, storage)| {
                alive && storage.as_deref().is_some_and(|s| s.has(index))
            })
            .map(|(slot, _)| ComponentTypeId::from_slot(slot))
    }

    /// Storage for `C`, if any component of that type was ever attached.
    #[must_use]
    pub fn storage<C: Component>(&self) -> Option<&ComponentStorage<C>> {
        let id = self.registry.id_of::<C>()?;
        self.storages
            .get(id.index())?
            .as_deref()?
            .as_any()
            .downcast_ref::<ComponentStorage<C>>()
    }

    /// Storage for `C`, registering the type and creating the storage if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::RegistrySealed`] if `C` is new and the registry
    /// is sealed.
    pub(crate) fn storage_mut<C: Component>(&mut self) -> EcsResult<&mut ComponentStorage<C>> {
        let id = self.registry.try_register::<C>()?;
        let slot = id.index();
        if slot >= self.storages.len() {
            self.storages.resize_with(slot + 1, || None);
        }
        let policy = self.policy;
        let storage = self.storages[slot].get_or_insert_with(|| {
            tracing::debug!(component = type_name::<C>(), %id, "creating component storage");
            Box::new(ComponentStorage::<C>::with_policy(
                policy.initial_capacity,
                policy.growth_factor,
                policy.recycle_limit,
            ))
        });
        storage
            .as_any_mut()
            .downcast_mut::<ComponentStorage<C>>()
            .ok_or(EcsError::UnregisteredComponent(type_name::<C>()))
    }

    fn existing_storage_mut<C: Component>(&mut self) -> Option<&mut ComponentStorage<C>> {
        let id = self.registry.id_of::<C>()?;
        self.storages
            .get_mut(id.index())?
            .as_deref_mut()?
            .as_any_mut()
            .downcast_mut::<ComponentStorage<C>>()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Starts building a [`TypeSet`] against this store's registry.
    #[must_use]
    pub fn type_set(&self) -> TypeSetBuilder<'_> {
        TypeSetBuilder {
            registry: &self.registry,
            set: TypeSet::default(),
        }
    }

    /// Live entities holding every type in `set`, in ascending index order.
    ///
    /// An empty set matches every live entity.
    #[must_use]
    pub fn for_each_with<'a>(&'a self, set: &'a TypeSet) -> QueryIter<'a> {
        let mut words = if set.unsatisfiable { 0 } else { self.alive.word_len() };
        for id in &set.ids {
            words = words.min(self.presence(*id).map_or(0, EntityBitset::word_len));
        }
        QueryIter {
            store: self,
            set,
            word: 0,
            words,
            current: BitIter { base: 0, bits: 0 },
        }
    }

    /// Calls `f` with mutable access to the `C` of every entity matched by
    /// `set`. `C` need not be part of `set`; entities without one are
    /// skipped.
    pub fn for_each_mut<C, F>(&mut self, set: &TypeSet, mut f: F)
    where
        C: Component,
        F: FnMut(EntityId, &mut C),
    {
        let words = self.for_each_with(set).words;
        for word in 0..words {
            let block = self.query_block(set, word);
            for index in (BitIter { base: word as u32 * 64, bits: block }) {
                let id = self.live[index as usize];
                if let Some(component) = self
                    .existing_storage_mut::<C>()
                    .and_then(|s| s.get_mut(index))
                {
                    f(id, component);
                }
            }
        }
    }

    /// Number of live entities matched by `set`.
    #[must_use]
    pub fn count_with(&self, set: &TypeSet) -> usize {
        let words = self.for_each_with(set).words;
        (0..words)
            .map(|word| self.query_block(set, word).count_ones() as usize)
            .sum()
    }

    fn presence(&self, id: ComponentTypeId) -> Option<&EntityBitset> {
        self.storages
            .get(id.index())?
            .as_deref()
            .map(ErasedStorage::presence)
    }

    fn query_block(&self, set: &TypeSet, word: usize) -> u64 {
        let mut block = self.alive.block(word);
        for id in &set.ids {
            if block == 0 {
                break;
            }
            block &= self.presence(*id).map_or(0, |bits| bits.block(word));
        }
        block
    }
}

/// A reusable set of component types to query for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeSet {
    ids: Vec<ComponentTypeId>,
    /// Set when a requested type was never registered: nothing can match.
    unsatisfiable: bool,
}

impl TypeSet {
    /// Builds a set from explicit type ids.
    #[must_use]
    pub fn from_ids(ids: impl IntoIterator<Item = ComponentTypeId>) -> Self {
        let mut ids: Vec<_> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        Self {
            ids,
            unsatisfiable: false,
        }
    }

    /// Type ids in the set.
    #[must_use]
    pub fn ids(&self) -> &[ComponentTypeId] {
        &self.ids
    }

    /// Whether the set names no types.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && !self.unsatisfiable
    }
}

/// Builder returned by [`ComponentStore::type_set`].
#[derive(Debug)]
pub struct TypeSetBuilder<'a> {
    registry: &'a ComponentRegistry,
    set: TypeSet,
}

impl TypeSetBuilder<'_> {
    /// Requires `C`.
    #[must_use]
    pub fn with<C: Component>(mut self) -> Self {
        match self.registry.id_of::<C>() {
            Some(id) if !self.set.ids.contains(&id) => self.set.ids.push(id),
            Some(_) => {}
            None => self.set.unsatisfiable = true,
        }
        self
    }

    /// Finishes the set.
    #[must_use]
    pub fn build(self) -> TypeSet {
        self.set
    }
}

/// Iterator returned by [`ComponentStore::for_each_with`].
#[derive(Debug)]
pub struct QueryIter<'a> {
    store: &'a ComponentStore,
    set: &'a TypeSet,
    word: usize,
    words: usize,
    current: BitIter,
}

impl Iterator for QueryIter<'_> {
    type Item = EntityId;

    fn next(&mut self) -> Option<EntityId> {
        loop {
            if let Some(index) = self.current.next() {
                return Some(self.store.live[index as usize]);
            }
            if self.word >= self.words {
                return None;
            }
            self.current = BitIter {
                base: self.word as u32 * 64,
                bits: self.store.query_block(self.set, self.word),
            };
            self.word += 1;
        }
    }
}
