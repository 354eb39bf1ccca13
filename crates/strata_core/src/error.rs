//! # Core Error Types
//!
//! All errors that can surface from the runtime core.
//!
//! Recoverable failures (stale identifiers, duplicate registration, hierarchy
//! cycles) are returned to the caller. Capacity exhaustion is fatal: the
//! panicking entry points (`IdentityPool::acquire`, `ComponentRegistry::register`)
//! are the normal path, the `try_*` variants exist for initialization code.

use thiserror::Error;

use crate::ecs::EntityId;

/// Errors that can occur in the runtime core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// The identifier is stale, null, or out of range.
    #[error("invalid entity: {0}")]
    InvalidEntity(EntityId),

    /// A bounded id space ran out.
    #[error("{resource} capacity exhausted (limit {limit})")]
    CapacityExhausted {
        /// What ran out ("entity index", "component type id").
        resource: &'static str,
        /// The configured limit.
        limit: usize,
    },

    /// A system of this concrete type is already registered.
    #[error("system already registered: {0}")]
    DuplicateSystem(&'static str),

    /// No system of this concrete type is registered.
    #[error("system not registered: {0}")]
    SystemNotFound(&'static str),

    /// The component type was never registered and the registry is sealed.
    #[error("component type not registered: {0}")]
    UnregisteredComponent(&'static str),

    /// The registry no longer accepts new entries.
    #[error("registry is sealed")]
    RegistrySealed,

    /// Attaching `child` under `parent` would close a loop.
    #[error("hierarchy cycle: {child} is an ancestor of {parent}")]
    CycleDetected {
        /// The requested parent.
        parent: EntityId,
        /// The requested child.
        child: EntityId,
    },

    /// An entity cannot be its own parent.
    #[error("entity {0} cannot be parented to itself")]
    SelfParent(EntityId),

    /// The entity has no transform, so it cannot join the hierarchy.
    #[error("entity {0} has no transform")]
    MissingTransform(EntityId),

    /// The world was disposed.
    #[error("world has been disposed")]
    WorldDisposed,
}

/// Result type for core operations.
pub type EcsResult<T> = Result<T, EcsError>;

/// Failure reported by a system hook.
///
/// Returning an error from a hook is contained by the scheduler: it is
/// logged, counted in the system's stats, and the pass continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SystemError {
    /// Free-form failure.
    #[error("{0}")]
    Failed(String),

    /// A core operation failed inside the hook.
    #[error(transparent)]
    Ecs(#[from] EcsError),
}

impl SystemError {
    /// Creates a free-form failure.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Result type for system hooks.
pub type SystemResult = Result<(), SystemError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let id = EntityId::new(3, 7);
        assert_eq!(EcsError::InvalidEntity(id).to_string(), "invalid entity: 3:7");

        let err = EcsError::CycleDetected {
            parent: EntityId::new(1, 0),
            child: EntityId::new(2, 0),
        };
        assert_eq!(err.to_string(), "hierarchy cycle: 2:0 is an ancestor of 1:0");
    }

    #[test]
    fn test_system_error_from_ecs() {
        let err: SystemError = EcsError::RegistrySealed.into();
        assert_eq!(err, SystemError::Ecs(EcsError::RegistrySealed));
        assert_eq!(err.to_string(), "registry is sealed");
    }
}
