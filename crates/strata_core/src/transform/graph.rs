//! # Transform Graph
//!
//! Parent/child operations over the transform storage.
//!
//! ## Invariants
//!
//! - Links always form a forest: `set_parent` rejects self-parenting and
//!   cycles before touching any link.
//! - `propagate` visits nodes in pre-order, so a parent's world TRS is
//!   fresh before any of its children recompute.
//! - Only dirty nodes and the subtrees below them recompute.

use crate::ecs::{ComponentStorage, EntityId};
use crate::error::{EcsError, EcsResult};

use super::component::Transform;
use super::math::Trs;

/// Hierarchy operations on a transform storage.
///
/// Ids passed in are expected to be live; the storage is keyed by index
/// alone, so the world validates generations before calling in.
///
/// # Example
///
/// ```rust
/// use strata_core::ecs::{ComponentStorage, EntityId};
/// use strata_core::transform::{Transform, TransformGraph, Vec3};
///
/// let root = EntityId::new(0, 0);
/// let child = EntityId::new(1, 0);
///
/// let mut transforms: ComponentStorage<Transform> = ComponentStorage::new(4);
/// transforms.set(root.index(), Transform::from_translation(Vec3::new(5.0, 0.0, 0.0)));
/// transforms.set(child.index(), Transform::from_translation(Vec3::new(1.0, 0.0, 0.0)));
///
/// transforms.set_parent(child, Some(root)).unwrap();
/// assert!(transforms.set_parent(root, Some(child)).is_err());
///
/// transforms.propagate();
/// let world = transforms.get(child.index()).unwrap().world_translation();
/// assert_eq!(world, Vec3::new(6.0, 0.0, 0.0));
/// ```
pub trait TransformGraph {
    /// Moves `child` under `parent` (appended after existing children), or
    /// makes it a root when `parent` is `None`. Marks `child` dirty.
    ///
    /// # Errors
    ///
    /// - [`EcsError::SelfParent`] if `child == parent`.
    /// - [`EcsError::MissingTransform`] if either has no transform.
    /// - [`EcsError::CycleDetected`] if `child` is an ancestor of `parent`.
    ///
    /// The hierarchy is unchanged when an error is returned.
    fn set_parent(&mut self, child: EntityId, parent: Option<EntityId>) -> EcsResult<()>;

    /// Makes `child` a root. Marks it dirty if it had a parent.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::MissingTransform`] if `child` has no transform.
    fn detach(&mut self, child: EntityId) -> EcsResult<()>;

    /// Detaches `id` from its parent and every child from `id`. The children
    /// become dirty roots. Used before the node goes away.
    fn isolate(&mut self, id: EntityId);

    /// Direct children of `id`, in attachment order.
    fn children(&self, id: EntityId) -> Children<'_>;

    /// Ancestors of `id`, nearest first.
    fn ancestors(&self, id: EntityId) -> Ancestors<'_>;

    /// Whether `ancestor` is a strict ancestor of `node`.
    fn is_ancestor(&self, ancestor: EntityId, node: EntityId) -> bool;

    /// Recomputes every dirty node and everything below it, parents first.
    /// Returns the number of nodes recomputed.
    fn propagate(&mut self) -> usize;

    /// World TRS of `id` computed from the ancestor chain, without reading
    /// or writing any cache. `None` if `id` has no transform.
    fn resolve_world(&self, id: EntityId) -> Option<Trs>;
}

impl TransformGraph for ComponentStorage<Transform> {
    fn set_parent(&mut self, child: EntityId, parent: Option<EntityId>) -> EcsResult<()> {
        let Some(parent) = parent else {
            return self.detach(child);
        };
        if child == parent {
            return Err(EcsError::SelfParent(child));
        }
        let current = node(self, child)?.parent;
        node(self, parent)?;
        if self.ancestors(parent).any(|a| a == child) {
            return Err(EcsError::CycleDetected { parent, child });
        }
        if current == Some(parent) {
            return Ok(());
        }

        unlink(self, child);

        let last = self.children(parent).last();
        match last {
            Some(last) => {
                if let Some(t) = self.get_mut(last.index()) {
                    t.next_sibling = Some(child);
                }
            }
            None => {
                if let Some(t) = self.get_mut(parent.index()) {
                    t.first_child = Some(child);
                }
            }
        }
        if let Some(t) = self.get_mut(child.index()) {
            t.parent = Some(parent);
            t.prev_sibling = last;
            t.next_sibling = None;
            t.mark_dirty();
        }
        tracing::trace!(%child, %parent, "transform parented");
        Ok(())
    }

    fn detach(&mut self, child: EntityId) -> EcsResult<()> {
        if node(self, child)?.parent.is_some() {
            unlink(self, child);
            tracing::trace!(%child, "transform detached");
        }
        Ok(())
    }

    fn isolate(&mut self, id: EntityId) {
        if !self.has(id.index()) {
            return;
        }
        unlink(self, id);

        let mut next = self.get(id.index()).and_then(|t| t.first_child);
        while let Some(child) = next {
            let Some(t) = self.get_mut(child.index()) else {
                break;
            };
            next = t.next_sibling;
            t.parent = None;
            t.prev_sibling = None;
            t.next_sibling = None;
            t.mark_dirty();
        }
        if let Some(t) = self.get_mut(id.index()) {
            t.clear_links();
        }
    }

    fn children(&self, id: EntityId) -> Children<'_> {
        Children {
            storage: self,
            next: self.get(id.index()).and_then(|t| t.first_child),
            remaining: self.len(),
        }
    }

    fn ancestors(&self, id: EntityId) -> Ancestors<'_> {
        Ancestors {
            storage: self,
            next: self.get(id.index()).and_then(|t| t.parent),
            remaining: self.len(),
        }
    }

    fn is_ancestor(&self, ancestor: EntityId, node: EntityId) -> bool {
        self.ancestors(node).any(|a| a == ancestor)
    }

    fn propagate(&mut self) -> usize {
        let roots: Vec<u32> = self
            .iter()
            .filter(|(_, t)| t.is_root())
            .map(|(index, _)| index)
            .collect();

        #[cfg(debug_assertions)]
        let mut visited = std::collections::HashSet::with_capacity(self.len());

        let mut recomputed = 0;
        // (index, parent world, whether the parent recomputed this pass)
        let mut stack: Vec<(u32, Option<Trs>, bool)> = Vec::new();
        for root in roots {
            stack.push((root, None, false));
            while let Some((index, parent_world, parent_changed)) = stack.pop() {
                #[cfg(debug_assertions)]
                if !visited.insert(index) {
                    tracing::error!(index, "transform visited twice, skipping subtree");
                    continue;
                }

                let Some(t) = self.get_mut(index) else {
                    continue;
                };
                let changed = parent_changed || t.is_dirty();
                if changed {
                    t.recompute(parent_world.as_ref());
                    recomputed += 1;
                }
                let world = *t.world();

                // Push in reverse so children pop in attachment order.
                let first = stack.len();
                let mut next = t.first_child;
                while let Some(child) = next {
                    stack.push((child.index(), Some(world), changed));
                    next = self.get(child.index()).and_then(|c| c.next_sibling);
                }
                stack[first..].reverse();
            }
        }
        recomputed
    }

    fn resolve_world(&self, id: EntityId) -> Option<Trs> {
        let local = *self.get(id.index())?.local();
        let chain: Vec<Trs> = self
            .ancestors(id)
            .filter_map(|a| self.get(a.index()).map(|t| *t.local()))
            .collect();
        let parent_world = chain
            .iter()
            .rev()
            .fold(Trs::IDENTITY, |acc, local| acc.compose(local));
        Some(if chain.is_empty() {
            local
        } else {
            parent_world.compose(&local)
        })
    }
}

fn node(storage: &ComponentStorage<Transform>, id: EntityId) -> EcsResult<&Transform> {
    storage
        .get(id.index())
        .ok_or(EcsError::MissingTransform(id))
}

/// Removes `id` from its parent's child list and clears its parent link.
fn unlink(storage: &mut ComponentStorage<Transform>, id: EntityId) {
    let Some(t) = storage.get(id.index()) else {
        return;
    };
    let (parent, prev, next) = (t.parent, t.prev_sibling, t.next_sibling);
    let Some(parent) = parent else {
        return;
    };

    match prev {
        Some(prev) => {
            if let Some(p) = storage.get_mut(prev.index()) {
                p.next_sibling = next;
            }
        }
        None => {
            if let Some(p) = storage.get_mut(parent.index()) {
                p.first_child = next;
            }
        }
    }
    if let Some(next) = next {
        if let Some(n) = storage.get_mut(next.index()) {
            n.prev_sibling = prev;
        }
    }
    if let Some(t) = storage.get_mut(id.index()) {
        t.parent = None;
        t.prev_sibling = None;
        t.next_sibling = None;
        t.mark_dirty();
    }
}

/// Iterator over direct children. See [`TransformGraph::children`].
#[derive(Debug)]
pub struct Children<'a> {
    storage: &'a ComponentStorage<Transform>,
    next: Option<EntityId>,
    /// Upper bound on steps, so a corrupted list cannot loop forever.
    remaining: usize,
}

impl Iterator for Children<'_> {
    type Item = EntityId;

    fn next(&mut self) -> Option<EntityId> {
        let current = self.next?;
        if self.remaining == 0 {
            tracing::error!(entity = %current, "sibling list longer than storage, stopping");
            return None;
        }
        self.remaining -= 1;
        self.next = self
            .storage
            .get(current.index())
            .and_then(|t| t.next_sibling)
            .filter(|&n| n != current);
        Some(current)
    }
}

/// Iterator over ancestors. See [`TransformGraph::ancestors`].
#[derive(Debug)]
pub struct Ancestors<'a> {
    storage: &'a ComponentStorage<Transform>,
    next: Option<EntityId>,
    remaining: usize,
}

impl Iterator for Ancestors<'_> {
    type Item = EntityId;

    fn next(&mut self) -> Option<EntityId> {
        let current = self.next?;
        if self.remaining == 0 {
            tracing::error!(entity = %current, "ancestor chain longer than storage, stopping");
            return None;
        }
        self.remaining -= 1;
        self.next = self
            .storage
            .get(current.index())
            .and_then(|t| t.parent)
            .filter(|&p| p != current);
        Some(current)
    }
}
