//! Gate Runner - headless native driver
//!
//! Runs one autopiloted attempt on a fixed-step clock and prints the results
//! card. Usage: `gate-runner [settings.json]`

use std::env;
use std::fs;

use gate_runner::consts::*;
use gate_runner::sim::{
    AiRacer, ColliderKind, CollisionEvent, GameEvent, RaceState, RaceStatus, TickInput,
    TrafficPool, tick,
};
use gate_runner::{RunSummary, Settings, is_off_road};

/// Host frame length (the sim substeps inside it)
const FRAME_DT: f32 = 1.0 / 30.0;
/// Give up after this much simulated time
const MAX_RUN_SECONDS: f32 = 600.0;
/// Competitors sharing the road
const AI_RACERS: usize = 4;
/// Contact box half extents between player and a vehicle
const CONTACT_HALF_WIDTH: f32 = 1.6;
const CONTACT_HALF_LENGTH: f32 = 2.6;

fn load_settings() -> Settings {
    let Some(path) = env::args().nth(1) else {
        return Settings::default();
    };

    match fs::read_to_string(&path) {
        Ok(json) => match Settings::from_json(&json) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path);
                settings
            }
            Err(err) => {
                log::warn!("Invalid settings in {}: {}; using defaults", path, err);
                Settings::default()
            }
        },
        Err(err) => {
            log::warn!("Could not read {}: {}; using defaults", path, err);
            Settings::default()
        }
    }
}

/// Steer toward the correct gate and keep the throttle pinned
fn autopilot(state: &RaceState) -> TickInput {
    let target = state
        .active_checkpoint()
        .and_then(|cp| cp.correct_gate())
        .map(|g| g.lane_index)
        .unwrap_or(state.current_lane);

    TickInput {
        lane_delta: (target as i32 - state.current_lane as i32).signum(),
        accelerate: true,
        brake: false,
    }
}

/// Contacts between the player and active traffic or the roadside barrier this frame
fn contacts(state: &RaceState, traffic: &TrafficPool) -> Vec<CollisionEvent> {
    let player = state.player_world;
    let barrier = is_off_road(player.x).then(|| CollisionEvent::new(ColliderKind::Barrier, 0.0));
    traffic
        .active()
        .iter()
        .filter(|v| {
            (v.position.x - player.x).abs() < CONTACT_HALF_WIDTH
                && (v.position.z - player.z).abs() < CONTACT_HALF_LENGTH
        })
        .filter_map(|v| traffic.relative_z(v.id, player.z))
        .map(|dz| CollisionEvent::new(ColliderKind::Traffic, dz))
        .chain(barrier)
        .collect()
}

fn main() {
    env_logger::init();

    let settings = load_settings();
    let seed = settings.seed.unwrap_or_else(rand::random);
    log::info!(
        "Gate Runner (headless) starting, seed {}, quality {}",
        seed,
        settings.quality.as_str()
    );

    let mut state = RaceState::new(seed);
    state.set_spark_cap(settings.max_particles());
    let mut traffic = TrafficPool::new(seed.wrapping_add(1));
    let mut racers = AiRacer::roster(AI_RACERS, seed.wrapping_add(2));

    let mut now_ms = 0.0_f64;
    let mut accumulator = 0.0_f32;
    state.start_countdown(now_ms);

    while state.status != RaceStatus::Ended && (now_ms / 1000.0) < MAX_RUN_SECONDS as f64 {
        accumulator += FRAME_DT;
        let mut substeps = 0;
        while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            now_ms += SIM_DT as f64 * 1000.0;
            state.update_countdown(now_ms);

            let input = autopilot(&state);
            tick(&mut state, &mut traffic, &input, SIM_DT, now_ms);

            for contact in contacts(&state, &traffic) {
                if state.handle_collision(&contact, now_ms) && settings.debug_physics {
                    log::info!(
                        "{:?} contact at relative z {:.2}",
                        contact.other,
                        contact.relative_z
                    );
                }
            }

            if state.is_running() {
                let obstacles = traffic.obstacles();
                let stage = state.current_checkpoint as u32 + 1;
                for racer in &mut racers {
                    racer.update(SIM_DT, now_ms, &obstacles, stage);
                }
            }

            accumulator -= SIM_DT;
            substeps += 1;
        }

        for event in state.drain_events() {
            match event {
                GameEvent::EngineUpdate { .. } => {}
                GameEvent::CheckpointResolved { id, result, points } => {
                    log::info!("Checkpoint {}: {:?} (+{})", id + 1, result, points);
                }
                other => log::debug!("{:?}", other),
            }
        }
    }

    for racer in &racers {
        log::info!(
            "{} covered {:.0} units at {:.1}",
            racer.profile.name,
            racer.distance,
            racer.speed
        );
    }

    match RunSummary::from_state(&state) {
        Some(summary) => {
            println!("\n{}", summary.title());
            for line in summary.lines() {
                println!("  {}", line);
            }
        }
        None => log::warn!("Run did not finish within {} seconds", MAX_RUN_SECONDS),
    }
}
