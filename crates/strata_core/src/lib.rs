//! # STRATA Core Runtime
//!
//! Object-composition runtime for real-time engines:
//! - Generational entity identifiers with LIFO slot reuse
//! - Per-type component storage queried through presence bitsets
//! - Typed signals with snapshot dispatch and deferred queues
//! - Priority-ordered systems with a single commit point per pass
//! - A parent/child transform graph propagated parents-first
//!
//! ## Architecture Rules
//!
//! 1. **No global state** - every [`World`] owns its registries; worlds in
//!    the same process never interfere
//! 2. **Deferred structure** - entities destroyed or components attached
//!    during a pass become visible at the commit that ends it
//! 3. **Faults stay local** - a panicking listener or failing system is
//!    logged and skipped, the frame goes on
//!
//! ## Example
//!
//! ```rust
//! use strata_core::{World, WorldConfig};
//! use strata_core::ecs::Name;
//! use strata_core::signal::EntityCreated;
//!
//! let mut world = World::new(WorldConfig::default());
//! world
//!     .signals()
//!     .subscribe::<EntityCreated, _>(|id| println!("created {id}"))
//!     .unwrap();
//!
//! let player = world.spawn_named("player").unwrap();
//! world.update(1.0 / 60.0);
//! assert_eq!(world.get::<Name>(player).map(Name::as_str), Some("player"));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod schedule;
pub mod signal;
pub mod transform;
pub mod world;

pub use config::{ConfigError, WorldConfig};
pub use ecs::{Component, CommandSender, ComponentStore, EntityId, IdentityPool, TypeSet};
pub use error::{EcsError, EcsResult, SystemError, SystemResult};
pub use schedule::{System, SystemContext};
pub use signal::{Channel, Signal, SignalRegistry};
pub use transform::{Transform, TransformGraph};
pub use world::{World, WorldStats};
