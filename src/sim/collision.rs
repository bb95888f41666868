//! Collision routing
//!
//! Contact detection belongs to whatever physics layer hosts the race. This
//! module only classifies the reports it produces and routes them into the
//! race state's damage and checkpoint-failure paths.

use glam::Vec3;

use super::state::{DamageOptions, GameEvent, RaceState};
use crate::consts::*;

/// What the player touched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColliderKind {
    Player,
    Traffic,
    Barrier,
    ClosedGate,
    Unknown,
}

/// Map a collider tag to its kind
pub fn classify_collider(tag: &str) -> ColliderKind {
    match tag {
        "player" => ColliderKind::Player,
        "traffic" | "vehicle" => ColliderKind::Traffic,
        "barrier" => ColliderKind::Barrier,
        "closedGate" | "closed_gate" => ColliderKind::ClosedGate,
        _ => ColliderKind::Unknown,
    }
}

/// A contact reported against the player
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionEvent {
    pub other: ColliderKind,
    /// Checkpoint a closed gate belongs to
    pub checkpoint_id: Option<usize>,
    /// Other body's z minus the player's z (positive = behind the player)
    pub relative_z: f32,
}

impl CollisionEvent {
    pub fn new(other: ColliderKind, relative_z: f32) -> Self {
        Self {
            other,
            checkpoint_id: None,
            relative_z,
        }
    }

    pub fn closed_gate(checkpoint_id: usize) -> Self {
        Self {
            other: ColliderKind::ClosedGate,
            checkpoint_id: Some(checkpoint_id),
            relative_z: 0.0,
        }
    }
}

/// Where a collision goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionRoute {
    Damage,
    FailCheckpoint(usize),
    Ignore,
}

pub fn route_collision(event: &CollisionEvent) -> CollisionRoute {
    match event.other {
        // Vehicles catching up from behind never hurt the player
        ColliderKind::Traffic if event.relative_z > REAR_HIT_GUARD => CollisionRoute::Ignore,
        ColliderKind::Traffic | ColliderKind::Barrier => CollisionRoute::Damage,
        ColliderKind::ClosedGate => event
            .checkpoint_id
            .map_or(CollisionRoute::Ignore, CollisionRoute::FailCheckpoint),
        ColliderKind::Player | ColliderKind::Unknown => CollisionRoute::Ignore,
    }
}

impl RaceState {
    /// Apply a collision report. Returns true when it changed the race.
    pub fn handle_collision(&mut self, event: &CollisionEvent, now_ms: f64) -> bool {
        if !self.is_running() {
            return false;
        }

        match route_collision(event) {
            CollisionRoute::Damage => {
                if !self.reduce_life(DamageOptions::default(), now_ms) {
                    return false;
                }
                log::debug!("{:?} hit at relative z {:.2}", event.other, event.relative_z);
                let impact = self.player_world + Vec3::new(0.0, 0.35, 0.0);
                if self.is_running() {
                    self.spawn_crash_sparks(impact);
                    self.knockback = KNOCKBACK_SPEED;
                } else {
                    // Run-ending wreck
                    self.spawn_heavy_sparks(impact);
                }
                self.emit(GameEvent::Crash);
                true
            }
            CollisionRoute::FailCheckpoint(id) => self.fail_checkpoint_by_collision(id, now_ms),
            CollisionRoute::Ignore => false,
        }
    }
}
