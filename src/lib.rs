//! Gate Runner - a checkpoint-gate highway runner
//!
//! Core modules:
//! - `sim`: Run simulation (race state machine, gate puzzles, traffic, sparks, AI)
//! - `settings`: Player preferences and quality presets
//! - `summary`: End-of-run leaderboard card data

pub mod settings;
pub mod sim;
pub mod summary;

pub use settings::{QualityPreset, Settings};
pub use summary::RunSummary;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep used by the native driver (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Lane centre x positions, left to right
    pub const LANES: [f32; 4] = [-6.0, -2.0, 2.0, 6.0];
    pub const LANE_COUNT: usize = LANES.len();
    /// Lane the player starts (and respawns) in
    pub const START_LANE: usize = 1;

    /// Road surface width; anything wider is sidewalk/grass
    pub const ROAD_WIDTH: f32 = 18.0;
    /// Player ride height above the road
    pub const START_Y: f32 = 1.05;

    /// Checkpoints per run
    pub const TOTAL_CHECKPOINTS: usize = 10;
    /// Distance between consecutive checkpoint lines (world units)
    pub const CHECKPOINT_SPACING: f32 = 420.0;
    /// Points awarded for solving checkpoint `i`
    pub const CHECKPOINT_REWARD_POINTS: [u32; TOTAL_CHECKPOINTS] =
        [5, 10, 15, 20, 25, 30, 35, 40, 45, 50];

    /// Speed ceiling (speed units)
    pub const MAX_SPEED: f32 = 90.0;
    /// Mandatory floor per checkpoint segment: min(50 + 10i, MAX_SPEED)
    pub const BASE_SPEEDS: [f32; TOTAL_CHECKPOINTS] =
        [50.0, 60.0, 70.0, 80.0, 90.0, 90.0, 90.0, 90.0, 90.0, 90.0];
    /// Converts speed units into world units per second
    pub const WORLD_SPEED_SCALE: f32 = 0.32;
    /// Held-accelerate gain (speed units/s)
    pub const ACCELERATE_RATE: f32 = 26.0;
    /// Held-brake loss (speed units/s)
    pub const BRAKE_RATE: f32 = 34.0;
    /// Passive decay back toward base speed (speed units/s)
    pub const SPEED_DECAY_RATE: f32 = 6.0;
    /// Per-tick easing of the player's x toward the lane centre
    pub const LANE_LERP: f32 = 0.15;
    /// Initial backwards shove after a traffic/barrier hit (world units/s)
    pub const KNOCKBACK_SPEED: f32 = 28.0;

    /// Lives at the start of a run
    pub const MAX_LIVES: u8 = 5;
    /// Minimum spacing between two collision damage events
    pub const DAMAGE_COOLDOWN_MS: f64 = 450.0;
    /// Duration of the "hit" wobble flag
    pub const HIT_FLAG_MS: f64 = 300.0;
    pub const DAMAGE_FLASH_MS: f64 = 280.0;
    pub const CAMERA_SHAKE_MS: f64 = 320.0;
    pub const POINTS_FLASH_MS: f64 = 260.0;
    /// Speed multiplier applied by a collision hit
    pub const COLLISION_SLOWDOWN: f32 = 0.72;
    /// Speed multiplier carried out of a failed checkpoint
    pub const CHECKPOINT_FAIL_SLOWDOWN: f32 = 0.75;
    /// Traffic hits from further behind than this are ignored
    pub const REAR_HIT_GUARD: f32 = 0.75;
}

use consts::*;

/// Clamp a (possibly out of range) lane index into the valid lanes
#[inline]
pub fn clamp_lane_index(lane: i32) -> usize {
    lane.clamp(0, LANE_COUNT as i32 - 1) as usize
}

/// World x of a lane centre
#[inline]
pub fn lane_x(lane: usize) -> f32 {
    LANES[lane.min(LANE_COUNT - 1)]
}

/// Number of open gates at checkpoint `index`
pub fn open_gate_count(index: usize) -> usize {
    match index {
        0..=2 => 4,
        3..=5 => 3,
        6..=7 => 2,
        8 => 3,
        _ => 1,
    }
}

/// Base speed for the segment leading to checkpoint `index` (clamped to the table)
#[inline]
pub fn base_speed_for(index: usize) -> f32 {
    BASE_SPEEDS[index.min(TOTAL_CHECKPOINTS - 1)]
}

/// True when `x` is past the road edge
#[inline]
pub fn is_off_road(x: f32) -> bool {
    x.abs() > ROAD_WIDTH * 0.5
}

/// Ease `current` toward `target` by `factor` (0 = stay, 1 = snap)
#[inline]
pub fn lerp(current: f32, target: f32, factor: f32) -> f32 {
    current + (target - current) * factor
}
