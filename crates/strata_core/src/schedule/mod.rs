//! # System Scheduler
//!
//! Ordered logic units driven once per frame and once per fixed step.

mod fixed_step;
mod scheduler;
mod system;

pub use fixed_step::{FixedStep, FixedStepStats};
pub use scheduler::Scheduler;
pub use system::{
    System, SystemContext, SystemState, SystemStats, PRIORITY_HIGH, PRIORITY_HIGHEST,
    PRIORITY_LOW, PRIORITY_LOWEST, PRIORITY_NORMAL,
};
