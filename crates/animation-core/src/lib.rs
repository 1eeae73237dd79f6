//! Blaster Animation Core
//!
//! The frame-indexed simulation behind both the live preview and the
//! recording pipeline:
//! - **State:** the global frame counter and the set of active instances
//! - **Scheduler:** round-robin admission and lifetime-based retirement
//! - **Motion:** directional drift and radial inward/outward movement
//! - **Scale:** per-instance scale interpolated over its age
//!
//! This crate is pure computation. The only input besides configuration is
//! the frame counter; wall-clock time never enters.

pub mod motion;
pub mod scale;
pub mod scheduler;
pub mod state;

pub use motion::apply_motion;
pub use scale::scale_factor;
pub use scheduler::{SpawnScheduler, TickReport};
pub use state::{ActiveInstance, SimulationState};
