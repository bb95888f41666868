//! Race state and the run state machine
//!
//! `RaceState` is the single source of truth for a run. It is an explicit
//! context value: the host owns it, feeds it intents, times and collision
//! reports, and reads it back for presentation. Every operation is a silent
//! no-op when it does not apply to the current status, so stale or duplicated
//! external events are always safe to deliver.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::countdown::{Countdown, CountdownStep};
use super::particles::{self, CRASH_SPARK_COUNT, MAX_SPARK_PARTICLES, SparkParticle};
use super::puzzle::{MathProblem, generate_checkpoints};
use crate::consts::*;
use crate::{base_speed_for, clamp_lane_index, lane_x};

/// Top-level race status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceStatus {
    /// Title screen
    Menu,
    /// 3-2-1-GO before the run
    Countdown,
    /// Active run
    Running,
    /// Run finished (see `RunOutcome`)
    Ended,
}

/// How a run ended; only meaningful when status is `Ended`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    None,
    Completed,
    Failed,
}

/// Which rule picks the correct gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PuzzleMode {
    /// Highest number wins
    Highest,
    /// Gate showing the answer to the arithmetic prompt wins
    Math,
}

/// Resolution of a checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckpointResult {
    None,
    Success,
    WrongGate,
    ClosedGateCollision,
}

/// What triggered a checkpoint resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveSource {
    /// Explicit resolution while inside a gate
    Pass,
    /// Player crossed the line without touching anything
    WrongGate,
    /// Player drove into a closed gate
    ClosedGateCollision,
}

impl ResolveSource {
    /// Result recorded when the resolution is a failure
    fn failure_result(self) -> CheckpointResult {
        match self {
            ResolveSource::Pass | ResolveSource::WrongGate => CheckpointResult::WrongGate,
            ResolveSource::ClosedGateCollision => CheckpointResult::ClosedGateCollision,
        }
    }
}

/// One lane's gate at a checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
    pub lane_index: usize,
    pub label: u32,
    pub open: bool,
    pub is_correct: bool,
}

/// A checkpoint line with its gate puzzle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: usize,
    /// World z of the line (negative, decreasing with id)
    pub z: f32,
    pub mode: PuzzleMode,
    pub prompt: String,
    /// Arithmetic problem for math boards
    pub problem: Option<MathProblem>,
    pub reward_points: u32,
    pub gates: Vec<Gate>,
    pub resolved: bool,
    pub result: CheckpointResult,
    /// Run-relative time of resolution
    pub resolved_at_ms: f64,
    /// Seconds spent on this checkpoint
    pub checkpoint_time_sec: f64,
}

impl Checkpoint {
    pub fn gate_for_lane(&self, lane: usize) -> Option<&Gate> {
        self.gates.iter().find(|g| g.lane_index == lane)
    }

    pub fn correct_gate(&self) -> Option<&Gate> {
        self.gates.iter().find(|g| g.is_correct)
    }

    pub fn open_gate_count(&self) -> usize {
        self.gates.iter().filter(|g| g.open).count()
    }
}

/// Outbound notifications (audio cues, HUD pulses) drained by the host
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    EngineStart,
    EngineStop,
    /// Per-tick engine parameters: speed in [0, 1], throttle in [0.3, 1]
    EngineUpdate { speed_norm: f32, throttle: f32 },
    CountdownTick { value: u8 },
    CountdownGo,
    Crash,
    CheckpointResolved {
        id: usize,
        result: CheckpointResult,
        points: u32,
    },
    RunEnded { outcome: RunOutcome },
}

/// Options for `RaceState::reduce_life`
#[derive(Debug, Clone, Copy)]
pub struct DamageOptions {
    /// Apply even inside the damage cooldown
    pub ignore_cooldown: bool,
    /// Scrub speed on impact
    pub slowdown: bool,
}

impl Default for DamageOptions {
    fn default() -> Self {
        Self {
            ignore_cooldown: false,
            slowdown: true,
        }
    }
}

fn default_rng() -> Pcg32 {
    Pcg32::seed_from_u64(0)
}

/// Complete race state for one attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceState {
    /// Seed this attempt's content was generated from
    pub seed: u64,
    #[serde(skip, default = "default_rng")]
    rng: Pcg32,

    pub status: RaceStatus,
    pub outcome: RunOutcome,
    pub countdown_value: u8,
    pub countdown_label: String,
    #[serde(skip)]
    countdown: Option<Countdown>,

    pub checkpoints: Vec<Checkpoint>,
    pub current_checkpoint: usize,
    pub checkpoints_covered: usize,

    pub max_lives: u8,
    pub lives: u8,
    pub total_points: u32,

    pub current_lane: usize,
    pub base_speed: f32,
    pub current_speed: f32,
    /// 1.0 accelerating, 0.3 braking/coasting floor
    pub player_throttle: f32,
    pub total_distance: f32,
    pub average_speed: f32,
    pub player_world: Vec3,
    /// Backwards shove after a hit (world units/s), decays to zero
    pub knockback: f32,

    pub start_at_ms: f64,
    pub end_at_ms: f64,
    pub elapsed_ms: f64,
    pub checkpoint_start_ms: f64,
    pub checkpoint_time_sec: f64,
    pub total_time_sec: f64,

    pub damage_flash_until: f64,
    pub camera_shake_until: f64,
    pub points_flash_until: f64,
    pub hit_until: f64,
    pub last_damage_at_ms: Option<f64>,

    /// Visual particles (not gameplay-affecting)
    #[serde(skip)]
    pub sparks: Vec<SparkParticle>,
    pub spark_cap: usize,

    #[serde(skip)]
    events: Vec<GameEvent>,
}

impl RaceState {
    /// Create a fresh attempt at the menu from `seed`
    pub fn new(seed: u64) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let checkpoints = generate_checkpoints(&mut rng);
        let base_speed = base_speed_for(0);

        Self {
            seed,
            rng,
            status: RaceStatus::Menu,
            outcome: RunOutcome::None,
            countdown_value: 3,
            countdown_label: "3".to_string(),
            countdown: None,
            checkpoints,
            current_checkpoint: 0,
            checkpoints_covered: 0,
            max_lives: MAX_LIVES,
            lives: MAX_LIVES,
            total_points: 0,
            current_lane: START_LANE,
            base_speed,
            current_speed: base_speed,
            player_throttle: 0.5,
            total_distance: 0.0,
            average_speed: 0.0,
            player_world: Vec3::new(lane_x(START_LANE), START_Y, 0.0),
            knockback: 0.0,
            start_at_ms: 0.0,
            end_at_ms: 0.0,
            elapsed_ms: 0.0,
            checkpoint_start_ms: 0.0,
            checkpoint_time_sec: 0.0,
            total_time_sec: 0.0,
            damage_flash_until: 0.0,
            camera_shake_until: 0.0,
            points_flash_until: 0.0,
            hit_until: 0.0,
            last_damage_at_ms: None,
            sparks: Vec::new(),
            spark_cap: MAX_SPARK_PARTICLES,
            events: Vec::new(),
        }
    }

    /// Build the next attempt: new content from this state's generator, all
    /// counters zeroed. Spark cap and undrained events carry over.
    pub fn next_attempt(&mut self, status: RaceStatus) -> Self {
        let mut next = Self::new(self.rng.random());
        next.status = status;
        next.spark_cap = self.spark_cap;
        next.events = std::mem::take(&mut self.events);
        if self.status == RaceStatus::Running {
            next.events.push(GameEvent::EngineStop);
        }
        next
    }

    pub fn total_checkpoints(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_running(&self) -> bool {
        self.status == RaceStatus::Running
    }

    /// Active (unresolved or not) checkpoint, if the run has one left
    pub fn active_checkpoint(&self) -> Option<&Checkpoint> {
        self.checkpoints.get(self.current_checkpoint)
    }

    /// Recent damage wobble
    pub fn is_hit(&self, now_ms: f64) -> bool {
        now_ms < self.hit_until
    }

    pub fn damage_flash_active(&self, now_ms: f64) -> bool {
        now_ms < self.damage_flash_until
    }

    pub fn camera_shake_active(&self, now_ms: f64) -> bool {
        now_ms < self.camera_shake_until
    }

    pub fn points_flash_active(&self, now_ms: f64) -> bool {
        now_ms < self.points_flash_until
    }

    /// Take all queued outbound events
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Peek at queued events without draining them
    pub fn pending_events(&self) -> &[GameEvent] {
        &self.events
    }

    pub(crate) fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Replace the live-particle cap (quality setting); trims immediately
    pub fn set_spark_cap(&mut self, cap: usize) {
        self.spark_cap = cap;
        particles::trim_oldest(&mut self.sparks, cap);
    }

    // --- Status transitions ---

    /// Back to the title screen with a fresh attempt
    pub fn go_menu(&mut self) {
        *self = self.next_attempt(RaceStatus::Menu);
        log::info!("Race status -> menu");
    }

    /// Fresh attempt and start the 3-2-1-GO sequence at `now_ms`
    pub fn start_countdown(&mut self, now_ms: f64) {
        let mut next = self.next_attempt(RaceStatus::Countdown);
        next.countdown = Some(Countdown::new(now_ms));
        *self = next;
        log::info!("Race status -> countdown");
    }

    /// Drive the countdown sequence; launches the run when it completes
    pub fn update_countdown(&mut self, now_ms: f64) {
        if self.status != RaceStatus::Countdown {
            self.countdown = None;
            return;
        }
        let Some(mut countdown) = self.countdown.take() else {
            return;
        };

        while let Some(step) = countdown.poll(now_ms) {
            match step {
                CountdownStep::Show { value, label } => {
                    self.countdown_value = value;
                    self.countdown_label = label.to_string();
                    if value == 0 {
                        self.emit(GameEvent::CountdownGo);
                    } else {
                        self.emit(GameEvent::CountdownTick { value });
                    }
                }
                CountdownStep::Launch => {
                    self.start_run(now_ms);
                    return;
                }
            }
        }

        self.countdown = Some(countdown);
    }

    /// Begin the run. Only valid from the countdown; re-rolls the attempt so
    /// nothing mutated during the countdown leaks into the run.
    pub fn start_run(&mut self, now_ms: f64) -> bool {
        if self.status != RaceStatus::Countdown {
            return false;
        }
        let mut next = self.next_attempt(RaceStatus::Running);
        next.start_at_ms = now_ms;
        next.checkpoint_start_ms = now_ms;
        next.emit(GameEvent::EngineStart);
        *self = next;
        log::info!("Race status -> running (seed {})", self.seed);
        true
    }

    // --- Player intents ---

    /// Move to lane `lane` (clamped); only while running
    pub fn set_lane_index(&mut self, lane: i32) {
        if !self.is_running() {
            return;
        }
        self.current_lane = clamp_lane_index(lane);
    }

    /// Throttle/brake by `delta` speed units, bounded by [base, MAX_SPEED]
    pub fn adjust_speed(&mut self, delta: f32) {
        if !self.is_running() {
            return;
        }
        self.current_speed = (self.current_speed + delta).clamp(self.base_speed, MAX_SPEED);
        self.player_throttle = if delta > 0.0 { 1.0 } else { 0.3 };
    }

    /// Per-frame bookkeeping: time, distance, average speed and passive decay
    pub fn update_player_frame(&mut self, dt: f32, world: Vec3, now_ms: f64) {
        self.player_world = world;
        if !self.is_running() {
            return;
        }

        self.elapsed_ms = (now_ms - self.start_at_ms).max(0.0);
        self.total_distance += self.current_speed.abs() * dt;
        self.average_speed = if self.elapsed_ms > 0.0 {
            self.total_distance / (self.elapsed_ms / 1000.0) as f32
        } else {
            0.0
        };

        let mut speed = self.current_speed;
        if speed > self.base_speed {
            speed = (speed - dt * SPEED_DECAY_RATE).max(self.base_speed);
        }
        self.current_speed = speed.clamp(self.base_speed, MAX_SPEED);
        self.player_throttle = (self.current_speed / MAX_SPEED).max(0.3);
    }

    // --- Checkpoints ---

    /// Fallback resolution: crossing the active line resolves it as a miss
    pub fn handle_checkpoint_pass(&mut self, player_z: f32, now_ms: f64) {
        if !self.is_running() {
            return;
        }
        let Some(checkpoint) = self.active_checkpoint() else {
            return;
        };
        if checkpoint.resolved {
            return;
        }
        if player_z <= checkpoint.z {
            self.resolve_current_checkpoint(ResolveSource::WrongGate, now_ms);
        }
    }

    /// Closed-gate hit on checkpoint `checkpoint_id`; stale ids are ignored
    pub fn fail_checkpoint_by_collision(&mut self, checkpoint_id: usize, now_ms: f64) -> bool {
        if !self.is_running() || checkpoint_id != self.current_checkpoint {
            return false;
        }
        self.resolve_current_checkpoint(ResolveSource::ClosedGateCollision, now_ms)
    }

    /// Score the active checkpoint against the player's lane and advance.
    /// Returns false when nothing was resolved.
    pub fn resolve_current_checkpoint(&mut self, source: ResolveSource, now_ms: f64) -> bool {
        if !self.is_running() {
            return false;
        }
        let index = self.current_checkpoint;
        let total = self.total_checkpoints();
        let Some(checkpoint) = self.checkpoints.get(index) else {
            return false;
        };
        if checkpoint.resolved {
            return false;
        }

        let success = checkpoint
            .gate_for_lane(self.current_lane)
            .is_some_and(|g| g.open && g.is_correct);
        let reward = if success { checkpoint.reward_points } else { 0 };
        let spent = self.finish_checkpoint_timer(now_ms);
        let result = if success {
            CheckpointResult::Success
        } else {
            source.failure_result()
        };

        let checkpoint = &mut self.checkpoints[index];
        checkpoint.resolved = true;
        checkpoint.result = result;
        checkpoint.resolved_at_ms = now_ms - self.start_at_ms;
        checkpoint.checkpoint_time_sec = spent;

        self.total_points += reward;
        if success {
            self.points_flash_until = now_ms + POINTS_FLASH_MS;
        } else {
            // Always costs a life, independent of the collision cooldown
            self.lives = self.lives.saturating_sub(1);
            self.hit_until = now_ms + HIT_FLAG_MS;
            self.last_damage_at_ms = Some(now_ms);
            self.damage_flash_until = now_ms + DAMAGE_FLASH_MS;
            self.camera_shake_until = now_ms + CAMERA_SHAKE_MS;
        }

        let next = index + 1;
        self.current_checkpoint = next;
        self.checkpoints_covered = next;

        let completed = next >= total;
        let failed = self.lives == 0;
        let next_base = if completed {
            self.base_speed
        } else {
            base_speed_for(next)
        };
        self.current_speed = if success {
            next_base
        } else {
            next_base.max(self.current_speed * CHECKPOINT_FAIL_SLOWDOWN)
        }
        .min(MAX_SPEED);
        self.base_speed = next_base;
        self.elapsed_ms = self.elapsed_ms.max(now_ms - self.start_at_ms);

        log::debug!(
            "Checkpoint {} resolved: {:?} (lane {}, +{} pts, {:.2}s)",
            index,
            result,
            self.current_lane,
            reward,
            spent
        );
        self.emit(GameEvent::CheckpointResolved {
            id: index,
            result,
            points: reward,
        });

        if !success {
            let origin = self.player_world + Vec3::new(0.0, 0.35, 0.0);
            if failed {
                self.spawn_heavy_sparks(origin);
            } else {
                self.spawn_crash_sparks(origin);
            }
            self.emit(GameEvent::Crash);
        }

        // Losing the last life fails the run even on the final checkpoint
        if failed {
            self.end_run(RunOutcome::Failed, now_ms);
        } else if completed {
            self.end_run(RunOutcome::Completed, now_ms);
        } else {
            self.checkpoint_start_ms = now_ms;
        }

        true
    }

    /// Close the checkpoint clock; returns seconds spent and folds them into the total
    fn finish_checkpoint_timer(&mut self, now_ms: f64) -> f64 {
        let spent = ((now_ms - self.checkpoint_start_ms) / 1000.0).max(0.0);
        self.checkpoint_time_sec = spent;
        self.total_time_sec += spent;
        spent
    }

    // --- Damage ---

    /// One point of collision damage, rate limited by the damage cooldown.
    /// Returns true when damage was applied.
    pub fn reduce_life(&mut self, opts: DamageOptions, now_ms: f64) -> bool {
        if !self.is_running() {
            return false;
        }
        if !opts.ignore_cooldown
            && self
                .last_damage_at_ms
                .is_some_and(|last| now_ms - last < DAMAGE_COOLDOWN_MS)
        {
            return false;
        }

        self.lives = self.lives.saturating_sub(1);
        if opts.slowdown {
            self.current_speed = self
                .base_speed
                .max(self.current_speed * COLLISION_SLOWDOWN);
        }
        self.hit_until = now_ms + HIT_FLAG_MS;
        self.last_damage_at_ms = Some(now_ms);
        self.damage_flash_until = now_ms + DAMAGE_FLASH_MS;
        self.camera_shake_until = now_ms + CAMERA_SHAKE_MS;

        log::debug!("Collision damage, {} lives left", self.lives);

        if self.lives == 0 {
            self.finish_checkpoint_timer(now_ms);
            self.elapsed_ms = self.elapsed_ms.max(now_ms - self.start_at_ms);
            self.end_run(RunOutcome::Failed, now_ms);
        }
        true
    }

    fn end_run(&mut self, outcome: RunOutcome, now_ms: f64) {
        self.status = RaceStatus::Ended;
        self.outcome = outcome;
        self.end_at_ms = now_ms;
        self.knockback = 0.0;
        self.emit(GameEvent::EngineStop);
        self.emit(GameEvent::RunEnded { outcome });
        log::info!(
            "Run ended: {:?}, {} pts, {}/{} checkpoints, {} lives, {:.2}s",
            outcome,
            self.total_points,
            self.checkpoints_covered,
            self.total_checkpoints(),
            self.lives,
            self.total_time_sec
        );
    }

    // --- Sparks ---

    /// Light crash burst at `origin`
    pub fn spawn_crash_sparks(&mut self, origin: Vec3) {
        let burst = particles::spawn_burst(&mut self.rng, origin, CRASH_SPARK_COUNT, false);
        self.sparks.extend(burst);
        particles::trim_oldest(&mut self.sparks, self.spark_cap);
    }

    /// Heavy crash burst (sparks plus smoke) at `origin`
    pub fn spawn_heavy_sparks(&mut self, origin: Vec3) {
        let burst = particles::spawn_burst(&mut self.rng, origin, CRASH_SPARK_COUNT, true);
        self.sparks.extend(burst);
        particles::trim_oldest(&mut self.sparks, self.spark_cap);
    }

    pub fn step_sparks(&mut self, dt: f32) {
        particles::advance(&mut self.sparks, dt, self.spark_cap);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Skip the countdown and start running at `now_ms`
    fn running_state(seed: u64, now_ms: f64) -> RaceState {
        let mut state = RaceState::new(seed);
        state.start_countdown(now_ms);
        assert!(state.start_run(now_ms));
        state.drain_events();
        state
    }

    fn correct_lane(state: &RaceState) -> usize {
        state
            .active_checkpoint()
            .and_then(|cp| cp.correct_gate())
            .map(|g| g.lane_index)
            .expect("active checkpoint has a correct gate")
    }

    fn wrong_open_lane(state: &RaceState) -> Option<usize> {
        state
            .active_checkpoint()
            .and_then(|cp| cp.gates.iter().find(|g| g.open && !g.is_correct))
            .map(|g| g.lane_index)
    }

    #[test]
    fn test_new_state_is_menu() {
        let state = RaceState::new(1);
        assert_eq!(state.status, RaceStatus::Menu);
        assert_eq!(state.outcome, RunOutcome::None);
        assert_eq!(state.lives, MAX_LIVES);
        assert_eq!(state.total_checkpoints(), TOTAL_CHECKPOINTS);
        assert_eq!(state.current_speed, BASE_SPEEDS[0]);
        assert_eq!(state.current_lane, START_LANE);
    }

    #[test]
    fn test_start_run_requires_countdown() {
        let mut state = RaceState::new(1);
        assert!(!state.start_run(0.0));
        assert_eq!(state.status, RaceStatus::Menu);

        state.start_countdown(0.0);
        assert_eq!(state.status, RaceStatus::Countdown);
        assert!(state.start_run(10.0));
        assert_eq!(state.status, RaceStatus::Running);
        assert_eq!(state.start_at_ms, 10.0);
        assert!(state.drain_events().contains(&GameEvent::EngineStart));
    }

    #[test]
    fn test_reset_rerolls_checkpoints() {
        let mut state = RaceState::new(5);
        let before = state.checkpoints.clone();
        state.start_countdown(0.0);
        assert_ne!(state.checkpoints, before);
        assert_eq!(state.lives, MAX_LIVES);
        assert_eq!(state.total_points, 0);
    }

    #[test]
    fn test_lane_and_speed_ignored_outside_running() {
        let mut state = RaceState::new(1);
        state.set_lane_index(3);
        state.adjust_speed(20.0);
        assert_eq!(state.current_lane, START_LANE);
        assert_eq!(state.current_speed, BASE_SPEEDS[0]);
    }

    #[test]
    fn test_speed_clamped_to_band() {
        let mut state = running_state(1, 0.0);
        state.adjust_speed(-100.0);
        assert_eq!(state.current_speed, state.base_speed);
        assert_eq!(state.player_throttle, 0.3);
        state.adjust_speed(500.0);
        assert_eq!(state.current_speed, MAX_SPEED);
        assert_eq!(state.player_throttle, 1.0);
    }

    #[test]
    fn test_passive_decay_toward_base() {
        let mut state = running_state(1, 0.0);
        state.adjust_speed(10.0);
        state.update_player_frame(1.0, Vec3::new(-2.0, START_Y, -16.0), 1000.0);
        assert!((state.current_speed - (BASE_SPEEDS[0] + 4.0)).abs() < 1e-4);
        assert!((state.total_distance - (BASE_SPEEDS[0] + 10.0)).abs() < 1e-4);
        assert_eq!(state.elapsed_ms, 1000.0);
        state.update_player_frame(10.0, Vec3::ZERO, 11000.0);
        assert_eq!(state.current_speed, BASE_SPEEDS[0]);
    }

    #[test]
    fn test_correct_gate_scores() {
        let mut state = running_state(42, 0.0);
        state.set_lane_index(correct_lane(&state) as i32);
        let reward = state.checkpoints[0].reward_points;

        assert!(state.resolve_current_checkpoint(ResolveSource::Pass, 2500.0));
        assert_eq!(state.checkpoints[0].result, CheckpointResult::Success);
        assert_eq!(state.total_points, reward);
        assert_eq!(state.current_checkpoint, 1);
        assert_eq!(state.checkpoints_covered, 1);
        assert_eq!(state.lives, MAX_LIVES);
        assert_eq!(state.base_speed, BASE_SPEEDS[1]);
        assert_eq!(state.current_speed, BASE_SPEEDS[1]);
        assert!((state.total_time_sec - 2.5).abs() < 1e-9);
        assert_eq!(state.checkpoint_start_ms, 2500.0);
        assert!(state.points_flash_active(2600.0));
    }

    #[test]
    fn test_wrong_gate_costs_life() {
        // First checkpoint has four open gates
        let mut state = running_state(3, 0.0);
        let lane = wrong_open_lane(&state).expect("checkpoint 0 has four open gates");
        state.set_lane_index(lane as i32);
        state.adjust_speed(30.0);
        let boosted = state.current_speed;

        assert!(state.resolve_current_checkpoint(ResolveSource::Pass, 1000.0));
        assert_eq!(state.checkpoints[0].result, CheckpointResult::WrongGate);
        assert_eq!(state.total_points, 0);
        assert_eq!(state.lives, MAX_LIVES - 1);
        assert_eq!(state.current_checkpoint, 1);
        assert_eq!(state.base_speed, BASE_SPEEDS[1]);
        assert_eq!(
            state.current_speed,
            BASE_SPEEDS[1].max(boosted * CHECKPOINT_FAIL_SLOWDOWN)
        );
        assert!(state.is_hit(1200.0));
        assert!(!state.is_hit(1300.0));
        assert!(!state.sparks.is_empty());
        assert!(state.drain_events().contains(&GameEvent::Crash));
    }

    #[test]
    fn test_crossing_line_resolves_as_wrong_gate() {
        let mut state = running_state(3, 0.0);
        let lane = wrong_open_lane(&state).expect("open wrong gate");
        state.set_lane_index(lane as i32);
        let z = state.checkpoints[0].z;

        state.handle_checkpoint_pass(z + 1.0, 500.0);
        assert!(!state.checkpoints[0].resolved);
        state.handle_checkpoint_pass(z, 600.0);
        assert_eq!(state.checkpoints[0].result, CheckpointResult::WrongGate);
        assert_eq!(state.lives, MAX_LIVES - 1);
    }

    #[test]
    fn test_crossing_line_in_correct_lane_succeeds() {
        let mut state = running_state(8, 0.0);
        state.set_lane_index(correct_lane(&state) as i32);
        let z = state.checkpoints[0].z;
        state.handle_checkpoint_pass(z - 0.5, 900.0);
        assert_eq!(state.checkpoints[0].result, CheckpointResult::Success);
    }

    #[test]
    fn test_stale_closed_gate_collision_ignored() {
        let mut state = running_state(9, 0.0);
        state.set_lane_index(correct_lane(&state) as i32);
        assert!(state.resolve_current_checkpoint(ResolveSource::Pass, 100.0));
        let lives = state.lives;
        let points = state.total_points;

        assert!(!state.fail_checkpoint_by_collision(0, 200.0));
        assert_eq!(state.lives, lives);
        assert_eq!(state.total_points, points);
        assert_eq!(state.current_checkpoint, 1);

        assert!(state.fail_checkpoint_by_collision(1, 300.0));
        assert_eq!(state.current_checkpoint, 2);
    }

    #[test]
    fn test_closed_gate_collision_result() {
        let mut state = running_state(10, 0.0);
        // Checkpoint 9 has a single open gate; walk there scoring correctly
        for _ in 0..9 {
            state.set_lane_index(correct_lane(&state) as i32);
            state.resolve_current_checkpoint(ResolveSource::Pass, 0.0);
        }
        let closed = state.checkpoints[9]
            .gates
            .iter()
            .find(|g| !g.open)
            .map(|g| g.lane_index)
            .expect("last checkpoint has closed gates");
        state.set_lane_index(closed as i32);
        assert!(state.fail_checkpoint_by_collision(9, 50.0));
        assert_eq!(
            state.checkpoints[9].result,
            CheckpointResult::ClosedGateCollision
        );
        assert_eq!(state.status, RaceStatus::Ended);
        assert_eq!(state.outcome, RunOutcome::Completed);
    }

    #[test]
    fn test_damage_cooldown() {
        let mut state = running_state(1, 0.0);
        assert!(state.reduce_life(DamageOptions::default(), 1000.0));
        assert!(!state.reduce_life(DamageOptions::default(), 1200.0));
        assert_eq!(state.lives, MAX_LIVES - 1);
        assert!(state.reduce_life(DamageOptions::default(), 1450.0));
        assert_eq!(state.lives, MAX_LIVES - 2);

        let bypass = DamageOptions {
            ignore_cooldown: true,
            ..Default::default()
        };
        assert!(state.reduce_life(bypass, 1451.0));
        assert_eq!(state.lives, MAX_LIVES - 3);
    }

    #[test]
    fn test_damage_slowdown_respects_base() {
        let mut state = running_state(1, 0.0);
        state.adjust_speed(40.0);
        state.reduce_life(DamageOptions::default(), 10.0);
        assert!((state.current_speed - (90.0 * COLLISION_SLOWDOWN).max(50.0)).abs() < 1e-4);

        let keep = DamageOptions {
            ignore_cooldown: true,
            slowdown: false,
        };
        let before = state.current_speed;
        state.reduce_life(keep, 20.0);
        assert_eq!(state.current_speed, before);
    }

    #[test]
    fn test_hit_flag_restarts_rather_than_stacks() {
        let mut state = running_state(1, 0.0);
        state.reduce_life(DamageOptions::default(), 0.0);
        state.reduce_life(DamageOptions::default(), 500.0);
        assert_eq!(state.hit_until, 800.0);
        assert!(state.is_hit(799.0));
        assert!(!state.is_hit(800.0));
    }

    #[test]
    fn test_last_life_ends_run_failed() {
        let mut state = running_state(1, 0.0);
        state.checkpoint_start_ms = 1000.0;
        for i in 0..MAX_LIVES {
            state.reduce_life(DamageOptions::default(), 1000.0 + i as f64 * 500.0);
        }
        assert_eq!(state.lives, 0);
        assert_eq!(state.status, RaceStatus::Ended);
        assert_eq!(state.outcome, RunOutcome::Failed);
        // Partial checkpoint time is folded in
        assert!((state.total_time_sec - 2.0).abs() < 1e-9);
        assert!(!state.reduce_life(DamageOptions::default(), 9000.0));
        let events = state.drain_events();
        assert!(events.contains(&GameEvent::RunEnded {
            outcome: RunOutcome::Failed
        }));
    }

    #[test]
    fn test_checkpoint_failure_on_last_life_fails_run() {
        let mut state = running_state(4, 0.0);
        state.lives = 1;
        let lane = wrong_open_lane(&state).expect("open wrong gate");
        state.set_lane_index(lane as i32);
        state.resolve_current_checkpoint(ResolveSource::Pass, 10.0);
        assert_eq!(state.lives, 0);
        assert_eq!(state.status, RaceStatus::Ended);
        assert_eq!(state.outcome, RunOutcome::Failed);
    }

    #[test]
    fn test_last_life_lost_on_final_checkpoint_fails_run() {
        let mut state = running_state(77, 0.0);
        for i in 0..TOTAL_CHECKPOINTS {
            // Alternate hits and misses; the fifth miss lands on the last checkpoint
            let lane = if i % 2 == 0 {
                correct_lane(&state)
            } else {
                let cp = state.active_checkpoint().expect("checkpoint");
                cp.gates
                    .iter()
                    .find(|g| !g.is_correct)
                    .map(|g| g.lane_index)
                    .expect("a wrong gate")
            };
            state.set_lane_index(lane as i32);
            assert!(state.resolve_current_checkpoint(ResolveSource::Pass, i as f64 * 1000.0));
            if i < TOTAL_CHECKPOINTS - 1 {
                assert_eq!(state.status, RaceStatus::Running);
            }
        }
        assert_eq!(state.lives, 0);
        assert_eq!(state.status, RaceStatus::Ended);
        assert_eq!(state.outcome, RunOutcome::Failed);
        assert_eq!(state.checkpoints_covered, TOTAL_CHECKPOINTS);
        assert!(state.sparks.iter().any(|p| p.smoke));
        assert!(!state.resolve_current_checkpoint(ResolveSource::Pass, 99_000.0));
    }

    #[test]
    fn test_all_checkpoints_with_lives_left_complete_run() {
        let mut state = running_state(78, 0.0);
        for i in 0..TOTAL_CHECKPOINTS {
            // Four misses, last checkpoint solved
            let lane = if i % 2 == 0 || i == TOTAL_CHECKPOINTS - 1 {
                correct_lane(&state)
            } else {
                wrong_open_lane(&state).unwrap_or_else(|| {
                    let cp = state.active_checkpoint().expect("checkpoint");
                    cp.gates
                        .iter()
                        .find(|g| !g.is_correct)
                        .map(|g| g.lane_index)
                        .expect("a wrong gate")
                })
            };
            state.set_lane_index(lane as i32);
            assert!(state.resolve_current_checkpoint(ResolveSource::Pass, i as f64 * 1000.0));
        }
        assert_eq!(state.lives, MAX_LIVES - 4);
        assert_eq!(state.status, RaceStatus::Ended);
        assert_eq!(state.outcome, RunOutcome::Completed);
        assert_eq!(state.checkpoints_covered, TOTAL_CHECKPOINTS);
    }

    #[test]
    fn test_single_life_miss_on_final_checkpoint_fails_run() {
        let mut state = running_state(21, 0.0);
        state.lives = 1;
        for i in 0..TOTAL_CHECKPOINTS - 1 {
            state.set_lane_index(correct_lane(&state) as i32);
            state.resolve_current_checkpoint(ResolveSource::Pass, i as f64 * 100.0);
        }
        let wrong = state.checkpoints[TOTAL_CHECKPOINTS - 1]
            .gates
            .iter()
            .find(|g| !g.is_correct)
            .map(|g| g.lane_index)
            .expect("a wrong gate");
        state.set_lane_index(wrong as i32);
        assert!(state.resolve_current_checkpoint(ResolveSource::WrongGate, 5000.0));
        assert_eq!(state.lives, 0);
        assert_eq!(state.status, RaceStatus::Ended);
        assert_eq!(state.outcome, RunOutcome::Failed);
    }

    #[test]
    fn test_spark_cap_applies() {
        let mut state = RaceState::new(1);
        state.set_spark_cap(30);
        state.spawn_crash_sparks(Vec3::ZERO);
        state.spawn_heavy_sparks(Vec3::ZERO);
        assert_eq!(state.sparks.len(), 30);
        assert!(state.sparks.iter().any(|p| p.smoke));
    }

    #[test]
    fn test_engine_stop_when_leaving_running() {
        let mut state = running_state(1, 0.0);
        state.go_menu();
        assert_eq!(state.status, RaceStatus::Menu);
        assert_eq!(state.drain_events(), vec![GameEvent::EngineStop]);
    }

    proptest! {
        #[test]
        fn prop_speed_stays_in_band(
            seed in any::<u64>(),
            ops in prop::collection::vec((-60.0f32..60.0, 0.0f32..0.5), 1..60),
        ) {
            let mut state = running_state(seed, 0.0);
            let mut now = 0.0;
            for (delta, dt) in ops {
                state.adjust_speed(delta);
                prop_assert!(state.current_speed >= state.base_speed);
                prop_assert!(state.current_speed <= MAX_SPEED);
                now += dt as f64 * 1000.0;
                state.update_player_frame(dt, state.player_world, now);
                prop_assert!(state.current_speed >= state.base_speed);
                prop_assert!(state.current_speed <= MAX_SPEED);
            }
        }

        #[test]
        fn prop_lives_never_increase(seed in any::<u64>(), lanes in prop::collection::vec(0i32..4, 10)) {
            let mut state = running_state(seed, 0.0);
            let mut lives = state.lives;
            for (i, lane) in lanes.into_iter().enumerate() {
                state.set_lane_index(lane);
                state.resolve_current_checkpoint(ResolveSource::Pass, i as f64 * 100.0);
                prop_assert!(state.lives <= lives);
                if state.lives == 0 {
                    prop_assert_eq!(state.status, RaceStatus::Ended);
                }
                lives = state.lives;
            }
        }
    }
}
