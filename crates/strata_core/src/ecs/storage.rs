//! # Component Storage
//!
//! Index-keyed storage for a single component type.
//!
//! The storage uses a sparse-slot strategy:
//! - Slot `i` holds the component of the entity whose index is `i`
//! - Access is O(1) via entity index
//! - The slot array grows geometrically and keeps existing contents
//! - A presence bitset feeds the query intersection
//!
//! Generations are not checked here; [`ComponentStore`](super::ComponentStore)
//! validates identifiers before touching a storage.

use std::any::Any;

use super::bitset::EntityBitset;
use super::component::Component;

/// Default growth factor for slot arrays.
pub const DEFAULT_GROWTH_FACTOR: f32 = 1.5;

/// Storage for a single component type.
///
/// # Type Parameters
///
/// * `C` - component type held in every slot
///
/// # Example
///
/// ```rust
/// use strata_core::ecs::{Component, ComponentStorage};
///
/// #[derive(Clone, Debug, Default, PartialEq)]
/// struct Speed(f32);
/// impl Component for Speed {}
///
/// let mut storage: ComponentStorage<Speed> = ComponentStorage::new(8);
/// storage.set(20, Speed(1.5));
/// assert_eq!(storage.get(20), Some(&Speed(1.5)));
/// assert!(storage.capacity() > 20);
/// ```
#[derive(Debug)]
pub struct ComponentStorage<C: Component> {
    /// Slot array indexed by entity index.
    slots: Vec<Option<C>>,
    /// Which slots are occupied.
    present: EntityBitset,
    /// Reset instances waiting to be reused.
    spares: Vec<C>,
    /// Maximum number of spares kept.
    spare_limit: usize,
    /// Multiplier applied when the slot array grows.
    growth_factor: f32,
}

impl<C: Component> ComponentStorage<C> {
    /// Creates storage with `capacity` empty slots.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_policy(capacity, DEFAULT_GROWTH_FACTOR, 0)
    }

    /// Creates storage with an explicit growth factor and spare limit.
    ///
    /// # Panics
    ///
    /// Panics if `growth_factor` is not greater than 1.
    #[must_use]
    pub fn with_policy(capacity: usize, growth_factor: f32, spare_limit: usize) -> Self {
        assert!(growth_factor > 1.0, "growth factor must be greater than 1");
        let mut slots = Vec::new();
        slots.resize_with(capacity, || None);

        Self {
            slots,
            present: EntityBitset::with_capacity(capacity),
            spares: Vec::new(),
            spare_limit,
            growth_factor,
        }
    }

    /// Number of slots currently allocated.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.present.len()
    }

    /// Whether no slot is occupied.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.present.is_empty()
    }

    /// Presence bitset, one bit per occupied slot.
    #[inline]
    #[must_use]
    pub fn presence(&self) -> &EntityBitset {
        &self.present
    }

    /// Stores `component` at `index`, returning the value it replaced.
    ///
    /// Grows the slot array geometrically when `index` is past the end.
    pub fn set(&mut self, index: u32, component: C) -> Option<C> {
        let slot = index as usize;
        if slot >= self.slots.len() {
            self.grow_to(slot + 1);
        }
        self.present.insert(index);
        self.slots[slot].replace(component)
    }

    /// Gets the component at `index`. Out-of-range indices are absent.
    #[inline]
    #[must_use]
    pub fn get(&self, index: u32) -> Option<&C> {
        self.slots.get(index as usize)?.as_ref()
    }

    /// Gets the component at `index` mutably.
    #[inline]
    pub fn get_mut(&mut self, index: u32) -> Option<&mut C> {
        self.slots.get_mut(index as usize)?.as_mut()
    }

    /// Takes the component out of `index`.
    pub fn remove(&mut self, index: u32) -> Option<C> {
        let taken = self.slots.get_mut(index as usize)?.take();
        if taken.is_some() {
            self.present.remove(index);
        }
        taken
    }

    /// Whether `index` holds a component.
    #[inline]
    #[must_use]
    pub fn has(&self, index: u32) -> bool {
        self.present.contains(index)
    }

    /// Resets `component` and keeps it for reuse, up to the spare limit.
    pub fn recycle(&mut self, mut component: C) {
        if self.spares.len() < self.spare_limit {
            component.reset();
            self.spares.push(component);
        }
    }

    /// Returns a reset instance, reusing a spare when one is available.
    #[must_use]
    pub fn obtain(&mut self) -> C {
        self.spares.pop().unwrap_or_default()
    }

    /// Number of spares waiting for reuse.
    #[inline]
    #[must_use]
    pub fn spare_count(&self) -> usize {
        self.spares.len()
    }

    /// Iterates over occupied slots with their indices.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &C)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|c| (index as u32, c)))
    }

    /// Iterates mutably over occupied slots with their indices.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u32, &mut C)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_mut().map(|c| (index as u32, c)))
    }

    /// Empties every slot, keeping the allocation.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.present.clear();
    }

    fn grow_to(&mut self, min_len: usize) {
        let grown = (self.slots.len() as f32 * self.growth_factor).ceil() as usize;
        let new_len = grown.max(min_len).max(4);
        tracing::trace!(
            component = std::any::type_name::<C>(),
            from = self.slots.len(),
            to = new_len,
            "growing component storage"
        );
        self.slots.resize_with(new_len, || None);
    }
}

/// Type-erased view over a [`ComponentStorage`], used by the store for
/// whole-entity operations and downcasting.
pub(crate) trait ErasedStorage: Send + Sync {
    /// Drops (recycling) the component at `index`, if any.
    fn discard(&mut self, index: u32) -> bool;
    /// Whether `index` holds a component.
    fn has(&self, index: u32) -> bool;
    /// Presence bitset.
    fn presence(&self) -> &EntityBitset;
    /// Number of occupied slots.
    fn len(&self) -> usize;
    /// Empties every slot.
    fn clear(&mut self);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<C: Component> ErasedStorage for ComponentStorage<C> {
    fn discard(&mut self, index: u32) -> bool {
        match self.remove(index) {
            Some(component) => {
                self.recycle(component);
                true
            }
            None => false,
        }
    }

    fn has(&self, index: u32) -> bool {
        ComponentStorage::has(self, index)
    }

    fn presence(&self) -> &EntityBitset {
        &self.present
    }

    fn len(&self) -> usize {
        ComponentStorage::len(self)
    }

    fn clear(&mut self) {
        ComponentStorage::clear(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
