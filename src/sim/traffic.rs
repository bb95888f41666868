//! Highway traffic pool
//!
//! A fixed set of vehicle slots. Only the first `active_count` slots drive;
//! that prefix grows as the player clears checkpoints. Vehicles cruise a bit
//! slower than the player so they are always being caught, and each one is
//! respawned ahead once it drops behind the player or strays too far forward.

use glam::Vec3;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::ai::Obstacle;
use super::state::RaceStatus;
use crate::consts::*;
use crate::{base_speed_for, lane_x};

/// Pool capacity
pub const MAX_TRAFFIC: usize = 20;
/// Active vehicles at the first checkpoint
pub const BASE_TRAFFIC: usize = 8;
/// Spawn band ahead of the player (world units)
pub const SPAWN_AHEAD_MIN: f32 = 240.0;
pub const SPAWN_AHEAD_MAX: f32 = 640.0;
/// Extra slack past the spawn band before a vehicle counts as too far ahead
pub const RECYCLE_AHEAD_SLACK: f32 = 120.0;
/// A vehicle this far behind the player is recycled
pub const RECYCLE_BEHIND_GUARD: f32 = 1.0;
/// Chance a spawn is a truck
pub const TRUCK_CHANCE: f64 = 0.36;

const CAR_COLORS: [u32; 5] = [0x9ca3af, 0x64748b, 0xf97316, 0x84cc16, 0x60a5fa];
const TRUCK_COLORS: [u32; 5] = [0x475569, 0x334155, 0x0f172a, 0x7c2d12, 0x1d4ed8];

const TRAFFIC_MIN_SPEED: f32 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleKind {
    Car,
    Truck,
}

impl VehicleKind {
    fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.random_bool(TRUCK_CHANCE) {
            VehicleKind::Truck
        } else {
            VehicleKind::Car
        }
    }

    /// Centre height above the road
    pub fn ride_height(self) -> f32 {
        match self {
            VehicleKind::Truck => 0.78,
            VehicleKind::Car => 0.6,
        }
    }

    pub fn palette(self) -> &'static [u32] {
        match self {
            VehicleKind::Truck => &TRUCK_COLORS,
            VehicleKind::Car => &CAR_COLORS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficVehicle {
    /// Slot index, stable across recycles
    pub id: usize,
    pub kind: VehicleKind,
    /// 0xRRGGBB
    pub color: u32,
    pub lane_index: usize,
    /// World units per second
    pub speed: f32,
    pub position: Vec3,
}

/// Player cruise speed in world units for checkpoint `checkpoint`
pub fn cruise_speed(checkpoint: usize) -> f32 {
    base_speed_for(checkpoint) * WORLD_SPEED_SCALE
}

/// Traffic speed band for checkpoint `checkpoint`: always under cruise
pub fn speed_band(checkpoint: usize) -> (f32, f32) {
    let cruise = cruise_speed(checkpoint);
    let min = (cruise - 8.0).max(TRAFFIC_MIN_SPEED);
    let max = (cruise - 3.0).max(min + 1.2);
    (min, max)
}

/// Active slots for checkpoint `checkpoint`
pub fn active_count_for(checkpoint: usize) -> usize {
    (BASE_TRAFFIC + checkpoint / 2).min(MAX_TRAFFIC)
}

#[derive(Debug, Clone)]
pub struct TrafficPool {
    rng: Pcg32,
    pub vehicles: Vec<TrafficVehicle>,
    pub active_count: usize,
    /// Status the pool was last laid out for
    status: Option<RaceStatus>,
}

impl TrafficPool {
    pub fn new(seed: u64) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let vehicles = (0..MAX_TRAFFIC)
            .map(|id| {
                let kind = VehicleKind::random(&mut rng);
                let color = kind.palette().choose(&mut rng).copied().unwrap_or(0);
                let mut vehicle = TrafficVehicle {
                    id,
                    kind,
                    color,
                    lane_index: 0,
                    speed: 0.0,
                    position: Vec3::ZERO,
                };
                place_ahead(&mut rng, &mut vehicle, 0.0, 0);
                vehicle
            })
            .collect();

        Self {
            rng,
            vehicles,
            active_count: BASE_TRAFFIC,
            status: None,
        }
    }

    /// Respawn every slot ahead of `player_z`, keeping each slot's look
    pub fn reset(&mut self, player_z: f32, checkpoint: usize) {
        for vehicle in &mut self.vehicles {
            place_ahead(&mut self.rng, vehicle, player_z, checkpoint);
        }
        self.active_count = active_count_for(checkpoint);
        log::debug!("Traffic reset around z {:.1}", player_z);
    }

    /// Reset once per race status change
    pub fn sync_status(&mut self, status: RaceStatus, player_z: f32, checkpoint: usize) {
        if self.status != Some(status) {
            self.status = Some(status);
            self.reset(player_z, checkpoint);
        }
    }

    /// Advance active vehicles and recycle the ones out of range.
    /// Returns how many were recycled.
    pub fn tick(&mut self, dt: f32, player_z: f32, checkpoint: usize, running: bool) -> usize {
        self.active_count = active_count_for(checkpoint);
        if !running {
            return 0;
        }

        let mut recycled = 0;
        for vehicle in self.vehicles.iter_mut().take(self.active_count) {
            vehicle.position.z -= vehicle.speed * dt;

            let behind = vehicle.position.z > player_z + RECYCLE_BEHIND_GUARD;
            let too_far = vehicle.position.z < player_z - (SPAWN_AHEAD_MAX + RECYCLE_AHEAD_SLACK);
            if behind || too_far {
                vehicle.kind = VehicleKind::random(&mut self.rng);
                vehicle.color = vehicle
                    .kind
                    .palette()
                    .choose(&mut self.rng)
                    .copied()
                    .unwrap_or(vehicle.color);
                place_ahead(&mut self.rng, vehicle, player_z, checkpoint);
                recycled += 1;

                log::debug!(
                    "Traffic recycle: slot {} {:?} lane {} z {:.2}",
                    vehicle.id,
                    vehicle.kind,
                    vehicle.lane_index,
                    vehicle.position.z
                );
            }
        }
        recycled
    }

    pub fn active(&self) -> &[TrafficVehicle] {
        &self.vehicles[..self.active_count.min(self.vehicles.len())]
    }

    /// Position every slot should be moved to this frame; parked slots sit below the road
    pub fn kinematic_targets(&self) -> impl Iterator<Item = (usize, Vec3)> + '_ {
        self.vehicles.iter().enumerate().map(|(i, v)| {
            if i < self.active_count {
                (v.id, v.position)
            } else {
                (v.id, Vec3::new(v.position.x, -40.0 - i as f32, v.position.z))
            }
        })
    }

    /// Active vehicles in the lane/distance frame the AI reasons in
    pub fn obstacles(&self) -> Vec<Obstacle> {
        let half_width = LANES[LANE_COUNT - 1];
        self.active()
            .iter()
            .map(|v| Obstacle {
                lane: v.position.x / half_width,
                distance: -v.position.z,
            })
            .collect()
    }

    /// Vehicle z minus `player_z` for an active slot, as collision reports carry it
    pub fn relative_z(&self, id: usize, player_z: f32) -> Option<f32> {
        self.active()
            .iter()
            .find(|v| v.id == id)
            .map(|v| v.position.z - player_z)
    }
}

fn place_ahead<R: Rng + ?Sized>(
    rng: &mut R,
    vehicle: &mut TrafficVehicle,
    player_z: f32,
    checkpoint: usize,
) {
    let (min_speed, max_speed) = speed_band(checkpoint);
    vehicle.lane_index = rng.random_range(0..LANE_COUNT);
    vehicle.speed = rng.random_range(min_speed..max_speed);
    vehicle.position = Vec3::new(
        lane_x(vehicle.lane_index),
        vehicle.kind.ride_height(),
        player_z - rng.random_range(SPAWN_AHEAD_MIN..SPAWN_AHEAD_MAX),
    );
}
