//! Crash spark and smoke bursts
//!
//! Particles are purely visual: they never feed back into gameplay. A burst is
//! a batch of short-lived sparks plus, for heavy impacts, a puff of slower
//! smoke that lingers and sinks gently.

use std::f32::consts::TAU;

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Maximum live particles kept across all bursts
pub const MAX_SPARK_PARTICLES: usize = 420;
/// Smoke puffs added to every heavy burst
pub const HEAVY_SMOKE_COUNT: usize = 14;
/// Sparks emitted for an ordinary crash
pub const CRASH_SPARK_COUNT: usize = 24;

/// Drag factors are per 60 Hz frame; they are rescaled for other step sizes
const DRAG_REFERENCE_HZ: f32 = 60.0;
const SPARK_DRAG: f32 = 0.92;
const SMOKE_DRAG: f32 = 0.88;
const SPARK_GRAVITY: f32 = -16.0;
const SMOKE_GRAVITY: f32 = -1.2;
const SMOKE_COLOR: [f32; 3] = [0.55, 0.55, 0.58];

/// A single spark or smoke puff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparkParticle {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Seconds remaining
    pub life: f32,
    /// Seconds at spawn (for fade/size curves)
    pub max_life: f32,
    /// Linear RGB
    pub color: [f32; 3],
    pub smoke: bool,
}

impl SparkParticle {
    /// Remaining life as a fraction of the spawn life (1 = fresh, 0 = gone)
    pub fn life_fraction(&self) -> f32 {
        if self.max_life <= 0.0 {
            0.0
        } else {
            (self.life / self.max_life).clamp(0.0, 1.0)
        }
    }
}

/// Emit a burst of `count` sparks around `origin`, plus smoke when `heavy`
pub fn spawn_burst<R: Rng + ?Sized>(
    rng: &mut R,
    origin: Vec3,
    count: usize,
    heavy: bool,
) -> Vec<SparkParticle> {
    let mut particles = Vec::with_capacity(count + if heavy { HEAVY_SMOKE_COUNT } else { 0 });

    let spread = if heavy { 1.2 } else { 0.8 };
    for _ in 0..count {
        let speed = if heavy {
            rng.random_range(7.0..13.0)
        } else {
            rng.random_range(5.0..10.0)
        };
        let angle: f32 = rng.random_range(0.0..TAU);
        let lift: f32 = rng.random_range(0.4..1.6);
        let life = rng.random_range(0.3..0.6);

        particles.push(SparkParticle {
            position: origin
                + Vec3::new(
                    rng.random_range(-0.2..0.2),
                    0.25,
                    rng.random_range(-0.2..0.2),
                ),
            velocity: Vec3::new(
                angle.cos() * speed * spread,
                lift * speed * 0.35,
                angle.sin() * speed * spread,
            ),
            life,
            max_life: life,
            color: [1.0, rng.random_range(0.45..0.8), rng.random_range(0.05..0.2)],
            smoke: false,
        });
    }

    if heavy {
        for _ in 0..HEAVY_SMOKE_COUNT {
            let angle: f32 = rng.random_range(0.0..TAU);
            let drift: f32 = rng.random_range(1.6..2.8);
            let life = rng.random_range(0.4..0.9);

            particles.push(SparkParticle {
                position: origin
                    + Vec3::new(
                        rng.random_range(-0.4..0.4),
                        0.4,
                        rng.random_range(-0.4..0.4),
                    ),
                velocity: Vec3::new(
                    angle.cos() * drift,
                    rng.random_range(0.8..1.8),
                    angle.sin() * drift,
                ),
                life,
                max_life: life,
                color: SMOKE_COLOR,
                smoke: true,
            });
        }
    }

    particles
}

/// Advance every particle by `dt`, dropping dead ones and trimming to `cap`
pub fn advance(particles: &mut Vec<SparkParticle>, dt: f32, cap: usize) {
    let frames = dt * DRAG_REFERENCE_HZ;

    particles.retain_mut(|p| {
        p.life -= dt;
        if p.life <= 0.0 {
            return false;
        }

        let (drag, gravity) = if p.smoke {
            (SMOKE_DRAG, SMOKE_GRAVITY)
        } else {
            (SPARK_DRAG, SPARK_GRAVITY)
        };
        let drag = drag.powf(frames);
        p.velocity.x *= drag;
        p.velocity.z *= drag;
        p.velocity.y += gravity * dt;
        p.position += p.velocity * dt;
        true
    });

    trim_oldest(particles, cap);
}

/// Drop the oldest entries (front of the list) until at most `cap` remain
pub fn trim_oldest(particles: &mut Vec<SparkParticle>, cap: usize) {
    if particles.len() > cap {
        let overflow = particles.len() - cap;
        particles.drain(..overflow);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_light_burst_has_only_sparks() {
        let mut rng = Pcg32::seed_from_u64(1);
        let burst = spawn_burst(&mut rng, Vec3::ZERO, CRASH_SPARK_COUNT, false);
        assert_eq!(burst.len(), CRASH_SPARK_COUNT);
        assert!(burst.iter().all(|p| !p.smoke));
        assert!(burst.iter().all(|p| p.life >= 0.3 && p.life < 0.6));
        assert!(burst.iter().all(|p| p.life == p.max_life));
    }

    #[test]
    fn test_heavy_burst_adds_smoke() {
        let mut rng = Pcg32::seed_from_u64(2);
        let burst = spawn_burst(&mut rng, Vec3::new(1.0, 2.0, -30.0), 10, true);
        assert_eq!(burst.len(), 10 + HEAVY_SMOKE_COUNT);
        let smoke: Vec<_> = burst.iter().filter(|p| p.smoke).collect();
        assert_eq!(smoke.len(), HEAVY_SMOKE_COUNT);
        assert!(smoke.iter().all(|p| p.color == SMOKE_COLOR));
    }

    #[test]
    fn test_particles_expire() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut particles = spawn_burst(&mut rng, Vec3::ZERO, 16, true);
        let spawned = particles.len();
        // Shortest possible life is 0.3s
        for _ in 0..15 {
            advance(&mut particles, 1.0 / 60.0, MAX_SPARK_PARTICLES);
        }
        assert_eq!(particles.len(), spawned);
        // Longest possible life is 0.9s
        for _ in 0..8 {
            advance(&mut particles, 0.1, MAX_SPARK_PARTICLES);
        }
        assert!(particles.is_empty());
    }

    #[test]
    fn test_sparks_fall_faster_than_smoke() {
        let spark = SparkParticle {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            life: 1.0,
            max_life: 1.0,
            color: [1.0, 0.5, 0.1],
            smoke: false,
        };
        let smoke = SparkParticle {
            smoke: true,
            ..spark.clone()
        };
        let mut particles = vec![spark, smoke];
        advance(&mut particles, 0.1, MAX_SPARK_PARTICLES);
        assert!(particles[0].velocity.y < particles[1].velocity.y);
        assert!((particles[0].life - 0.9).abs() < 1e-5);
    }

    #[test]
    fn test_cap_drops_oldest_first() {
        let mut rng = Pcg32::seed_from_u64(4);
        let mut particles = spawn_burst(&mut rng, Vec3::ZERO, 10, false);
        let newest = spawn_burst(&mut rng, Vec3::new(0.0, 0.0, -100.0), 5, false);
        particles.extend(newest.iter().cloned());
        trim_oldest(&mut particles, 5);
        assert_eq!(particles, newest);
    }
}
