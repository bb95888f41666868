//! Computer racer lane choice and pacing
//!
//! Racers work in a normalized lane coordinate (-1 = left edge lane, 1 = right
//! edge lane) and a forward distance along the road. Progress is linear; there
//! is no closed track.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::lerp;

/// Candidate lanes a racer considers
pub const AI_LANES: [f32; 3] = [-1.0, 0.0, 1.0];
/// Forward window for lane scoring (world units)
pub const LOOK_AHEAD: f32 = 22.0;
/// Forward window for braking behind an obstacle
pub const NEAR_WINDOW: f32 = 11.0;
/// Lane easing sharpness
pub const LANE_SHARPNESS: f32 = 5.8;

const LANE_CHANGE_COST: f32 = 0.3;
const SAME_LANE_GAP: f32 = 0.35;
const SAME_LANE_PENALTY: f32 = 4.0;
const OPEN_ROAD_BONUS: f32 = 0.4;
const BLOCKED_LANE_GAP: f32 = 0.38;
const BLOCKED_SPEED_FACTOR: f32 = 0.75;
const SPEED_EASE_RATE: f32 = 1.5;
const PER_STAGE_BOOST: f32 = 2.8;
const DIFFICULTY_BOOST: f32 = 2.2;
const VARIANCE_SCALE: f32 = 1.4;
const DECISION_MIN_MS: f64 = 250.0;
const DECISION_MAX_MS: f64 = 450.0;
/// Starting gap between consecutive racers
const GRID_STAGGER: f32 = 6.0;

const RACER_NAMES: [&str; 4] = ["Axel", "Blaze", "Nyx", "Rogue"];

/// Something a racer should steer around
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Normalized lane coordinate
    pub lane: f32,
    /// Forward distance along the road
    pub distance: f32,
}

/// Pick the best of `AI_LANES` given obstacles within `look_ahead` of `distance`
pub fn choose_safe_lane(
    current_lane: f32,
    distance: f32,
    obstacles: &[Obstacle],
    look_ahead: f32,
) -> f32 {
    let mut best_lane = current_lane;
    let mut best_score = f32::NEG_INFINITY;

    for lane in AI_LANES {
        let mut score = -(lane - current_lane).abs() * LANE_CHANGE_COST;

        for obstacle in obstacles {
            let delta = obstacle.distance - distance;
            if delta <= 0.0 || delta > look_ahead {
                continue;
            }
            if (lane - obstacle.lane).abs() < SAME_LANE_GAP {
                // Closer obstacles cost more
                score -= SAME_LANE_PENALTY * (look_ahead - delta) / look_ahead;
            } else {
                score += OPEN_ROAD_BONUS;
            }
        }

        if score > best_score {
            best_score = score;
            best_lane = lane;
        }
    }

    best_lane
}

/// Exponential ease of `current` toward `target`
pub fn smooth_lane(current: f32, target: f32, dt: f32, sharpness: f32) -> f32 {
    let factor = 1.0 - (-sharpness * dt).exp();
    current + (target - current) * factor
}

/// Racer personality
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiProfile {
    pub id: String,
    pub name: String,
    pub base_speed: f32,
    /// Scales the random pace variance
    pub aggression: f32,
    /// Added to every lane decision
    pub lane_bias: f32,
}

impl AiProfile {
    pub fn random<R: Rng + ?Sized>(index: usize, rng: &mut R) -> Self {
        let name = RACER_NAMES
            .get(index)
            .map(|n| n.to_string())
            .unwrap_or_else(|| format!("Racer-{}", index + 1));
        Self {
            id: format!("ai-{}", index + 1),
            name,
            base_speed: rng.random_range(34.0..40.0),
            aggression: rng.random_range(0.75..1.1),
            lane_bias: rng.random_range(-0.25..0.25),
        }
    }
}

/// Pace for `stage` (1-based). `jitter` in [0, 1] picks the variance.
pub fn target_speed(profile: &AiProfile, stage: u32, jitter: f32) -> f32 {
    let stage_boost = stage.saturating_sub(1) as f32 * PER_STAGE_BOOST;
    let difficulty = stage.saturating_sub(1) as f32 * DIFFICULTY_BOOST;
    let variance = profile.aggression * VARIANCE_SCALE * jitter.clamp(0.0, 1.0);
    profile.base_speed + stage_boost + difficulty + variance
}

/// A computer-driven racer
#[derive(Debug, Clone)]
pub struct AiRacer {
    pub profile: AiProfile,
    rng: Pcg32,
    pub lane: f32,
    pub target_lane: f32,
    pub speed: f32,
    pub distance: f32,
    next_decision_ms: f64,
    jitter: f32,
}

impl AiRacer {
    /// Racer `index` on the starting grid
    pub fn new(profile: AiProfile, index: usize, seed: u64) -> Self {
        let lane = ((index % 3) as f32 - 1.0) * 0.6;
        let speed = profile.base_speed * 0.8;
        Self {
            profile,
            rng: Pcg32::seed_from_u64(seed),
            lane,
            target_lane: lane,
            speed,
            distance: (index + 1) as f32 * GRID_STAGGER,
            next_decision_ms: 0.0,
            jitter: 0.5,
        }
    }

    /// `count` racers with random profiles
    pub fn roster(count: usize, seed: u64) -> Vec<AiRacer> {
        let mut rng = Pcg32::seed_from_u64(seed);
        (0..count)
            .map(|i| {
                let profile = AiProfile::random(i, &mut rng);
                AiRacer::new(profile, i, rng.random())
            })
            .collect()
    }

    /// Step one frame. `stage` is the 1-based segment the race is in.
    pub fn update(&mut self, dt: f32, now_ms: f64, obstacles: &[Obstacle], stage: u32) {
        if now_ms >= self.next_decision_ms {
            let lane = choose_safe_lane(self.lane, self.distance, obstacles, LOOK_AHEAD);
            self.target_lane = (lane + self.profile.lane_bias).clamp(-1.0, 1.0);
            self.jitter = self.rng.random();
            self.next_decision_ms = now_ms + self.rng.random_range(DECISION_MIN_MS..DECISION_MAX_MS);
        }

        self.lane = smooth_lane(self.lane, self.target_lane, dt, LANE_SHARPNESS);

        let mut target = target_speed(&self.profile, stage, self.jitter);
        if self.is_blocked(obstacles) {
            target *= BLOCKED_SPEED_FACTOR;
        }
        self.speed = lerp(self.speed, target, (dt * SPEED_EASE_RATE).min(1.0));
        self.distance += self.speed * dt;
    }

    /// Obstacle close ahead in (nearly) the racer's lane
    pub fn is_blocked(&self, obstacles: &[Obstacle]) -> bool {
        obstacles.iter().any(|o| {
            let delta = o.distance - self.distance;
            (o.lane - self.lane).abs() <= BLOCKED_LANE_GAP && delta > 0.0 && delta < NEAR_WINDOW
        })
    }

    /// World position on the road
    pub fn world_position(&self) -> Vec3 {
        Vec3::new(self.lane * LANES[LANE_COUNT - 1], START_Y, -self.distance)
    }
}
