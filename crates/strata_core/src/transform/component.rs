//! The transform component.
//!
//! Hierarchy links are identifiers into the same transform storage, which
//! makes the storage an arena and the links its "pointers". Links are only
//! changed by [`TransformGraph`](super::TransformGraph).

use super::math::{Quat, Trs, Vec3};
use crate::ecs::{Component, EntityId};

/// Local and cached world TRS plus hierarchy links.
///
/// The cached world TRS is only meaningful while [`is_dirty`](Self::is_dirty)
/// is false. Every local setter marks the transform dirty.
#[derive(Clone, Debug, PartialEq)]
pub struct Transform {
    local: Trs,
    world: Trs,
    dirty: bool,
    pub(crate) parent: Option<EntityId>,
    pub(crate) first_child: Option<EntityId>,
    pub(crate) next_sibling: Option<EntityId>,
    pub(crate) prev_sibling: Option<EntityId>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::from_trs(Trs::IDENTITY)
    }
}

impl Component for Transform {}

impl Transform {
    /// Creates an unparented transform from a local TRS.
    #[must_use]
    pub const fn from_trs(local: Trs) -> Self {
        Self {
            local,
            world: local,
            dirty: true,
            parent: None,
            first_child: None,
            next_sibling: None,
            prev_sibling: None,
        }
    }

    /// Creates an unparented transform at `translation`.
    #[must_use]
    pub const fn from_translation(translation: Vec3) -> Self {
        Self::from_trs(Trs::from_translation(translation))
    }

    /// Builder: sets the local rotation.
    #[must_use]
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.set_rotation(rotation);
        self
    }

    /// Builder: sets the local scale.
    #[must_use]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.set_scale(scale);
        self
    }

    /// Local TRS.
    #[must_use]
    pub const fn local(&self) -> &Trs {
        &self.local
    }

    /// Replaces the local TRS.
    pub fn set_local(&mut self, local: Trs) {
        self.local = local;
        self.mark_dirty();
    }

    /// Local position.
    #[must_use]
    pub const fn translation(&self) -> Vec3 {
        self.local.translation
    }

    /// Sets the local position.
    pub fn set_translation(&mut self, translation: Vec3) {
        self.local.translation = translation;
        self.mark_dirty();
    }

    /// Moves the local position by `delta`.
    pub fn translate(&mut self, delta: Vec3) {
        self.local.translation += delta;
        self.mark_dirty();
    }

    /// Local rotation.
    #[must_use]
    pub const fn rotation(&self) -> Quat {
        self.local.rotation
    }

    /// Sets the local rotation.
    pub fn set_rotation(&mut self, rotation: Quat) {
        self.local.rotation = rotation;
        self.mark_dirty();
    }

    /// Applies `delta` after the current local rotation.
    pub fn rotate(&mut self, delta: Quat) {
        self.local.rotation = (delta * self.local.rotation).normalize();
        self.mark_dirty();
    }

    /// Local scale.
    #[must_use]
    pub const fn scale(&self) -> Vec3 {
        self.local.scale
    }

    /// Sets the local scale.
    pub fn set_scale(&mut self, scale: Vec3) {
        self.local.scale = scale;
        self.mark_dirty();
    }

    /// Cached world TRS. Stale while dirty.
    #[must_use]
    pub const fn world(&self) -> &Trs {
        &self.world
    }

    /// Cached world position.
    #[must_use]
    pub const fn world_translation(&self) -> Vec3 {
        self.world.translation
    }

    /// Whether the cached world TRS needs recomputing.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Flags the cached world TRS as stale.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Recomputes the world TRS from the parent's world TRS (`None` for a
    /// root) and clears the dirty flag.
    pub fn recompute(&mut self, parent_world: Option<&Trs>) {
        self.world = match parent_world {
            Some(parent) => parent.compose(&self.local),
            None => self.local,
        };
        self.dirty = false;
    }

    /// Parent in the hierarchy.
    #[must_use]
    pub const fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    /// First child in the hierarchy.
    #[must_use]
    pub const fn first_child(&self) -> Option<EntityId> {
        self.first_child
    }

    /// Next sibling under the same parent.
    #[must_use]
    pub const fn next_sibling(&self) -> Option<EntityId> {
        self.next_sibling
    }

    /// Previous sibling under the same parent.
    #[must_use]
    pub const fn prev_sibling(&self) -> Option<EntityId> {
        self.prev_sibling
    }

    /// Whether this node has no parent.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Copies the hierarchy links of `other`, keeping this node's TRS.
    pub(crate) fn adopt_links(&mut self, other: &Self) {
        self.parent = other.parent;
        self.first_child = other.first_child;
        self.next_sibling = other.next_sibling;
        self.prev_sibling = other.prev_sibling;
    }

    /// Drops every hierarchy link.
    pub(crate) fn clear_links(&mut self) {
        self.parent = None;
        self.first_child = None;
        self.next_sibling = None;
        self.prev_sibling = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setters_mark_dirty() {
        let mut t = Transform::default();
        t.recompute(None);
        assert!(!t.is_dirty());

        t.set_translation(Vec3::X);
        assert!(t.is_dirty());
        t.recompute(None);
        t.set_scale(Vec3::splat(2.0));
        assert!(t.is_dirty());
    }

    #[test]
    fn test_root_world_equals_local() {
        let mut t = Transform::from_translation(Vec3::new(1.0, 2.0, 3.0));
        t.recompute(None);
        assert_eq!(t.world(), t.local());
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let parent = Trs::new(
            Vec3::new(3.0, -1.0, 0.5),
            Quat::from_rotation_y(0.7),
            Vec3::new(1.0, 2.0, 0.5),
        );
        let mut t = Transform::from_translation(Vec3::new(0.25, 4.0, -2.0))
            .with_rotation(Quat::from_rotation_z(1.1));
        t.recompute(Some(&parent));
        let first = bytemuck::bytes_of(t.world()).to_vec();
        t.recompute(Some(&parent));
        assert_eq!(bytemuck::bytes_of(t.world()), first.as_slice());
    }
}
