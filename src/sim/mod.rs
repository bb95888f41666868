//! Deterministic run simulation
//!
//! All gameplay logic lives here. The module never reads a clock or touches a
//! renderer:
//! - Host time arrives as `now_ms`
//! - Seeded RNG only
//! - Collisions arrive as reports, positions leave as kinematic targets

pub mod ai;
pub mod collision;
pub mod countdown;
pub mod particles;
pub mod puzzle;
pub mod state;
pub mod tick;
pub mod traffic;

pub use ai::{AiProfile, AiRacer, Obstacle, choose_safe_lane, smooth_lane, target_speed};
pub use collision::{ColliderKind, CollisionEvent, CollisionRoute, classify_collider, route_collision};
pub use countdown::{Countdown, CountdownStep};
pub use particles::{SparkParticle, advance, spawn_burst};
pub use puzzle::{MathOp, MathProblem, generate_checkpoints};
pub use state::{
    Checkpoint, CheckpointResult, DamageOptions, GameEvent, Gate, PuzzleMode, RaceState,
    RaceStatus, ResolveSource, RunOutcome,
};
pub use tick::{TickInput, tick};
pub use traffic::{TrafficPool, TrafficVehicle, VehicleKind};
