//! # Transform Graph
//!
//! Hierarchical spatial state.
//!
//! - [`math`]: `Vec3`, `Quat`, `Trs`
//! - [`Transform`]: local and cached world TRS plus hierarchy links
//! - [`TransformGraph`]: parenting, traversal and propagation

mod component;
mod graph;
pub mod math;
mod systems;

pub use component::Transform;
pub use graph::{Ancestors, Children, TransformGraph};
pub use math::{Quat, Trs, Vec3};
pub use systems::{LifetimeSystem, TransformPropagationSystem};
