//! Per-frame simulation step
//!
//! Applies player intent, moves the player along the road, runs the checkpoint
//! line check and advances sparks and traffic.

use glam::Vec3;

use super::state::{GameEvent, RaceState};
use super::traffic::TrafficPool;
use crate::consts::*;
use crate::{lane_x, lerp};

/// Player intent for a single tick (already edge-detected by the input layer)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInput {
    /// Lane change request: -1 left, +1 right, 0 none
    pub lane_delta: i32,
    /// Accelerate held
    pub accelerate: bool,
    /// Brake held
    pub brake: bool,
}

/// Advance the race by `dt` seconds at host time `now_ms`
pub fn tick(state: &mut RaceState, traffic: &mut TrafficPool, input: &TickInput, dt: f32, now_ms: f64) {
    traffic.sync_status(state.status, state.player_world.z, state.current_checkpoint);

    let running = state.is_running();
    if running {
        if input.lane_delta != 0 {
            state.set_lane_index(state.current_lane as i32 + input.lane_delta);
        }

        let mut speed_delta = 0.0;
        if input.accelerate {
            speed_delta += ACCELERATE_RATE * dt;
        }
        if input.brake {
            speed_delta -= BRAKE_RATE * dt;
        }
        if speed_delta != 0.0 {
            state.adjust_speed(speed_delta);
        }
    }

    // Knockback can stall forward travel but never reverse it
    let forward = if running {
        (state.current_speed * dt * WORLD_SPEED_SCALE - state.knockback * dt).max(0.0)
    } else {
        0.0
    };
    state.knockback = (state.knockback - KNOCKBACK_SPEED * dt).max(0.0);

    let current = state.player_world;
    let next = Vec3::new(
        lerp(current.x, lane_x(state.current_lane), LANE_LERP),
        START_Y,
        current.z - forward,
    );

    if running {
        state.handle_checkpoint_pass(next.z, now_ms);
    }
    state.update_player_frame(dt, next, now_ms);
    state.step_sparks(dt);

    traffic.tick(
        dt,
        state.player_world.z,
        state.current_checkpoint,
        state.is_running(),
    );

    if state.is_running() {
        let speed_norm = (state.current_speed / MAX_SPEED).min(1.0);
        state.emit(GameEvent::EngineUpdate {
            speed_norm,
            throttle: state.player_throttle,
        });
    }
}
