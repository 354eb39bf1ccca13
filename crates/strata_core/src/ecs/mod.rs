//! # Entity Component System
//!
//! Identity, component data and the structural mutation queue.
//!
//! ## Design
//!
//! - Entity ids are an index plus a generation counter bumped on release
//! - Each component type gets its own index-keyed storage and presence bitset
//! - Queries intersect bitsets one 64-bit block at a time
//! - Structural changes made during a pass go through [`CommandSender`]

mod bitset;
mod command;
mod component;
pub mod components;
mod entity;
mod pool;
mod storage;
mod store;

pub use bitset::EntityBitset;
pub(crate) use command::{Command, CommandQueue};
pub use command::CommandSender;
pub use component::{Component, ComponentRegistry, ComponentTypeId, MAX_COMPONENT_TYPES};
pub use components::{Active, Lifetime, Name, Tag, Visible};
pub use entity::EntityId;
pub use pool::IdentityPool;
pub use storage::{ComponentStorage, DEFAULT_GROWTH_FACTOR};
pub use store::{ComponentStore, QueryIter, StoragePolicy, TypeSet, TypeSetBuilder};
