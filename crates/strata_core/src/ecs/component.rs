//! # Component System
//!
//! Components are plain data records with no behavior beyond duplication
//! (`Clone`) and `reset`, which returns a recycled instance to its default
//! state before reuse.
//!
//! Each component type gets a small integer id from the world's
//! [`ComponentRegistry`]. Ids are handed out once, in registration order,
//! and never change or get reused for the registry's lifetime.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;

use crate::error::{EcsError, EcsResult};

/// Upper bound on distinct component types per registry.
pub const MAX_COMPONENT_TYPES: usize = 1024;

/// Marker trait for ECS components.
///
/// Components must be:
/// - `Clone`: duplicated by value (the `copy` operation)
/// - `Default`: the state a recycled instance is reset to
/// - `Send + Sync`: attachable from loader threads through the command queue
///
/// # Example
///
/// ```rust
/// use strata_core::ecs::Component;
///
/// #[derive(Clone, Debug, Default, PartialEq)]
/// struct Health(u32);
///
/// impl Component for Health {}
/// ```
pub trait Component: Clone + Default + Send + Sync + 'static {
    /// Returns this instance to its default state.
    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Stable small integer identifying a registered component type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ComponentTypeId(u16);

impl ComponentTypeId {
    pub(crate) const fn from_slot(slot: usize) -> Self {
        Self(slot as u16)
    }

    /// Returns the id as a slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Explicit type-to-id table.
///
/// Populated by `register` calls at startup; queries then work purely on
/// [`ComponentTypeId`]s. Once [`seal`](Self::seal)ed, unknown types are
/// rejected.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    ids: HashMap<TypeId, ComponentTypeId>,
    names: Vec<&'static str>,
    sealed: bool,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `C`, returning its id. Idempotent.
    ///
    /// # Panics
    ///
    /// Panics if the registry is sealed or all [`MAX_COMPONENT_TYPES`] ids
    /// are taken. Both mean startup registration went wrong.
    pub fn register<C: Component>(&mut self) -> ComponentTypeId {
        match self.try_register::<C>() {
            Ok(id) => id,
            Err(err) => {
                tracing::error!(%err, component = type_name::<C>(), "component registration failed");
                panic!("{err}");
            }
        }
    }

    /// Registers `C`, reporting failure as an error.
    ///
    /// # Errors
    ///
    /// - [`EcsError::RegistrySealed`] if `C` is new and the registry is sealed.
    /// - [`EcsError::CapacityExhausted`] if every type id is taken.
    pub fn try_register<C: Component>(&mut self) -> EcsResult<ComponentTypeId> {
        if let Some(&id) = self.ids.get(&TypeId::of::<C>()) {
            return Ok(id);
        }
        if self.sealed {
            return Err(EcsError::RegistrySealed);
        }
        if self.names.len() >= MAX_COMPONENT_TYPES {
            return Err(EcsError::CapacityExhausted {
                resource: "component type id",
                limit: MAX_COMPONENT_TYPES,
            });
        }

        let id = ComponentTypeId(self.names.len() as u16);
        self.ids.insert(TypeId::of::<C>(), id);
        self.names.push(type_name::<C>());
        tracing::debug!(component = type_name::<C>(), %id, "registered component type");
        Ok(id)
    }

    /// Looks up the id of `C`.
    #[inline]
    #[must_use]
    pub fn id_of<C: Component>(&self) -> Option<ComponentTypeId> {
        self.ids.get(&TypeId::of::<C>()).copied()
    }

    /// Looks up the id of `C`, failing if it was never registered.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnregisteredComponent`] for unknown types.
    pub fn expect_id<C: Component>(&self) -> EcsResult<ComponentTypeId> {
        self.id_of::<C>()
            .ok_or(EcsError::UnregisteredComponent(type_name::<C>()))
    }

    /// Type name recorded for `id`.
    #[must_use]
    pub fn name_of(&self, id: ComponentTypeId) -> Option<&'static str> {
        self.names.get(id.index()).copied()
    }

    /// Number of registered types.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no type has been registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Stops accepting new types.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Whether the registry is sealed.
    #[inline]
    #[must_use]
    pub const fn is_sealed(&self) -> bool {
        self.sealed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct A;
    impl Component for A {}

    #[derive(Clone, Default)]
    struct B;
    impl Component for B {}

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Counter(u32);
    impl Component for Counter {}

    #[test]
    fn test_ids_are_sequential_and_stable() {
        let mut registry = ComponentRegistry::new();
        let a = registry.register::<A>();
        let b = registry.register::<B>();
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(registry.register::<A>(), a);
        assert_eq!(registry.id_of::<B>(), Some(b));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_sealed_registry_rejects_new_types() {
        let mut registry = ComponentRegistry::new();
        let a = registry.register::<A>();
        registry.seal();
        assert_eq!(registry.try_register::<A>(), Ok(a));
        assert_eq!(registry.try_register::<B>(), Err(EcsError::RegistrySealed));
        assert!(matches!(
            registry.expect_id::<B>(),
            Err(EcsError::UnregisteredComponent(_))
        ));
    }

    #[test]
    fn test_default_reset() {
        let mut c = Counter(9);
        c.reset();
        assert_eq!(c, Counter(0));
    }

    #[test]
    fn test_name_lookup() {
        let mut registry = ComponentRegistry::new();
        let id = registry.register::<Counter>();
        assert!(registry.name_of(id).unwrap().ends_with("Counter"));
        assert_eq!(id.to_string(), "#0");
    }

    #[derive(Clone, Default)]
    struct Slot<const N: usize>;
    impl<const N: usize> Component for Slot<N> {}

    macro_rules! register_slots {
        (@row $registry:ident; $hi:literal; $($lo:literal)*) => {
            $(assert!($registry.try_register::<Slot<{ $hi * 32 + $lo }>>().is_ok());)*
        };
        ($registry:ident; $($hi:literal)*) => {
            $(register_slots!(@row $registry; $hi; 0 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15 16 17 18 19 20 21 22 23 24 25 26 27 28 29 30 31);)*
        };
    }

    fn full_registry() -> ComponentRegistry {
        let mut registry = ComponentRegistry::new();
        register_slots!(registry; 0 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15 16 17 18 19 20 21 22 23 24 25 26 27 28 29 30 31);
        registry
    }

    #[test]
    fn test_type_id_space_is_bounded() {
        let mut registry = full_registry();
        assert_eq!(registry.len(), MAX_COMPONENT_TYPES);
        assert_eq!(
            registry.id_of::<Slot<1023>>().map(ComponentTypeId::index),
            Some(1023)
        );

        assert_eq!(
            registry.try_register::<A>(),
            Err(EcsError::CapacityExhausted {
                resource: "component type id",
                limit: MAX_COMPONENT_TYPES,
            })
        );
        assert_eq!(registry.id_of::<A>(), None);
        assert_eq!(registry.len(), MAX_COMPONENT_TYPES);
        // Known types still resolve.
        assert!(registry.try_register::<Slot<0>>().is_ok());
    }

    #[test]
    #[should_panic(expected = "capacity exhausted")]
    fn test_register_panics_when_full() {
        let mut registry = full_registry();
        registry.register::<B>();
    }

    #[test]
    #[should_panic(expected = "registry is sealed")]
    fn test_register_panics_when_sealed() {
        let mut registry = ComponentRegistry::new();
        registry.seal();
        registry.register::<A>();
    }
}
