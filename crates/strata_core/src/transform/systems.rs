//! Built-in systems.

use crate::ecs::{Lifetime, TypeSet};
use crate::error::SystemResult;
use crate::schedule::{System, SystemContext, PRIORITY_HIGH, PRIORITY_LOWEST};

use super::component::Transform;
use super::graph::TransformGraph;

/// Recomputes dirty world transforms after every other system has run.
#[derive(Debug, Default)]
pub struct TransformPropagationSystem {
    last_recomputed: usize,
}

impl TransformPropagationSystem {
    /// Nodes recomputed by the most recent pass.
    #[must_use]
    pub const fn last_recomputed(&self) -> usize {
        self.last_recomputed
    }
}

impl System for TransformPropagationSystem {
    fn name(&self) -> &'static str {
        "transform_propagation"
    }

    fn priority(&self) -> i32 {
        PRIORITY_LOWEST
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>, _dt: f32) -> SystemResult {
        let transforms = ctx.store_mut().storage_mut::<Transform>()?;
        self.last_recomputed = transforms.propagate();
        Ok(())
    }
}

/// Ages every [`Lifetime`] and queues destruction of expired entities.
#[derive(Debug, Default)]
pub struct LifetimeSystem {
    query: TypeSet,
}

impl System for LifetimeSystem {
    fn name(&self) -> &'static str {
        "lifetime"
    }

    fn priority(&self) -> i32 {
        PRIORITY_HIGH
    }

    fn initialize(&mut self, ctx: &mut SystemContext<'_>) -> SystemResult {
        ctx.register_component::<Lifetime>()?;
        self.query = ctx.components().type_set().with::<Lifetime>().build();
        Ok(())
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>, dt: f32) -> SystemResult {
        let commands = ctx.commands().clone();
        ctx.for_each_mut::<Lifetime, _>(&self.query, |id, lifetime| {
            if lifetime.is_expired() || lifetime.tick(dt) {
                tracing::trace!(entity = %id, "lifetime expired");
                commands.destroy(id);
            }
        });
        Ok(())
    }
}
