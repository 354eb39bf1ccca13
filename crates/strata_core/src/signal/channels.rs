//! Engine-level channels every world registers.

use super::registry::{Channel, SignalRegistry};
use crate::ecs::EntityId;
use crate::error::EcsResult;

/// An entity became live. Payload: its id.
#[derive(Debug)]
pub struct EntityCreated;

impl Channel for EntityCreated {
    type Event = EntityId;
    const NAME: &'static str = "entity-created";
}

/// An entity is being destroyed. Dispatched before its components are
/// removed, so listeners can still read them.
#[derive(Debug)]
pub struct EntityDestroyed;

impl Channel for EntityDestroyed {
    type Event = EntityId;
    const NAME: &'static str = "entity-destroyed";
}

/// The active scene changed.
#[derive(Debug)]
pub struct SceneChanged;

impl Channel for SceneChanged {
    type Event = SceneChange;
    const NAME: &'static str = "scene-changed";
}

/// Payload of [`SceneChanged`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SceneChange {
    /// Scene that was active before, if any.
    pub previous: Option<String>,
    /// Scene now active.
    pub current: String,
}

/// Start of a variable-step frame, before any system runs.
#[derive(Debug)]
pub struct EngineUpdate;

impl Channel for EngineUpdate {
    type Event = UpdateEvent;
    const NAME: &'static str = "engine-update";
}

/// Payload of [`EngineUpdate`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UpdateEvent {
    /// Frame delta in seconds, after clamping.
    pub delta: f32,
    /// Seconds elapsed since the world was created, including `delta`.
    pub total_elapsed: f64,
}

/// The world was disposed. Last event a world dispatches.
#[derive(Debug)]
pub struct EngineStopped;

impl Channel for EngineStopped {
    type Event = ();
    const NAME: &'static str = "engine-stopped";
}

/// Registers every engine channel on `signals`.
///
/// # Errors
///
/// Fails only if `signals` was sealed before the engine channels were added.
pub fn register_engine_channels(signals: &SignalRegistry) -> EcsResult<()> {
    signals.register::<EntityCreated>()?;
    signals.register::<EntityDestroyed>()?;
    signals.register::<SceneChanged>()?;
    signals.register::<EngineUpdate>()?;
    signals.register::<EngineStopped>()?;
    Ok(())
}
