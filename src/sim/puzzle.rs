//! Checkpoint gate puzzles
//!
//! Every run lays out `TOTAL_CHECKPOINTS` checkpoints. Each one has a gate per
//! lane; some gates are open, exactly one open gate is correct. The correct
//! gate is either the highest number on the board or the answer to a small
//! arithmetic problem. Modes tend to alternate: each checkpoint has an even
//! chance of flipping away from the previous one.

use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};

use super::state::{Checkpoint, CheckpointResult, Gate, PuzzleMode};
use crate::consts::*;
use crate::open_gate_count;

/// Correct label range for highest-number boards
pub const HIGHEST_CORRECT_MIN: u32 = 72;
pub const HIGHEST_CORRECT_MAX: u32 = 99;
/// Range distractors are drawn from before being forced under the winner
const HIGHEST_DISTRACTOR_MIN: u32 = 18;
const HIGHEST_DISTRACTOR_MAX: u32 = 88;

/// Every math-mode label lives in this range
pub const MATH_LABEL_MAX: u32 = 18;
/// Distractors are first tried within this distance of the answer
const MATH_NEAR_SPREAD: i32 = 4;
/// Near-answer draws before falling back to the free pool
const MATH_NEAR_ATTEMPTS: usize = 6;

/// Arithmetic operator for math puzzles
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MathOp {
    Add,
    Sub,
}

/// A single-digit `a op b` problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MathProblem {
    pub a: u32,
    pub b: u32,
    pub op: MathOp,
}

impl MathProblem {
    /// Draw a problem: addition with a, b in 1..=9, or subtraction with b <= a
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.random_bool(0.5) {
            Self {
                a: rng.random_range(1..=9),
                b: rng.random_range(1..=9),
                op: MathOp::Add,
            }
        } else {
            let a = rng.random_range(2..=9);
            Self {
                a,
                b: rng.random_range(1..=a),
                op: MathOp::Sub,
            }
        }
    }

    pub fn answer(&self) -> u32 {
        match self.op {
            MathOp::Add => self.a + self.b,
            MathOp::Sub => self.a - self.b,
        }
    }

    /// Board text, e.g. `7 - 3 = ?`
    pub fn prompt(&self) -> String {
        let symbol = match self.op {
            MathOp::Add => '+',
            MathOp::Sub => '-',
        };
        format!("{} {} {} = ?", self.a, symbol, self.b)
    }
}

/// Pick the next mode: an even chance to flip away from `previous`
fn next_mode<R: Rng + ?Sized>(rng: &mut R, previous: PuzzleMode) -> PuzzleMode {
    if rng.random_bool(0.5) {
        match previous {
            PuzzleMode::Math => PuzzleMode::Highest,
            PuzzleMode::Highest => PuzzleMode::Math,
        }
    } else {
        previous
    }
}

/// Generate the full run of checkpoints
pub fn generate_checkpoints<R: Rng + ?Sized>(rng: &mut R) -> Vec<Checkpoint> {
    let mut previous = if rng.random_bool(0.5) {
        PuzzleMode::Highest
    } else {
        PuzzleMode::Math
    };

    (0..TOTAL_CHECKPOINTS)
        .map(|index| {
            let mode = next_mode(rng, previous);
            previous = mode;
            generate_checkpoint(rng, index, mode)
        })
        .collect()
}

/// Generate checkpoint `index` in the given mode
pub fn generate_checkpoint<R: Rng + ?Sized>(
    rng: &mut R,
    index: usize,
    mode: PuzzleMode,
) -> Checkpoint {
    let mut lanes: Vec<usize> = (0..LANE_COUNT).collect();
    lanes.shuffle(rng);
    let open_lanes = &lanes[..open_gate_count(index).min(LANE_COUNT)];

    let mut gates: Vec<Gate> = (0..LANE_COUNT)
        .map(|lane_index| Gate {
            lane_index,
            label: 0,
            open: open_lanes.contains(&lane_index),
            is_correct: false,
        })
        .collect();

    let correct = open_lanes.choose(rng).copied().unwrap_or(0);
    gates[correct].open = true;
    gates[correct].is_correct = true;

    let (prompt, problem) = match mode {
        PuzzleMode::Highest => {
            label_highest(rng, &mut gates, correct);
            ("Go through Highest Number".to_string(), None)
        }
        PuzzleMode::Math => {
            let problem = MathProblem::random(rng);
            label_math(rng, &mut gates, correct, problem.answer());
            (problem.prompt(), Some(problem))
        }
    };

    Checkpoint {
        id: index,
        z: -((index + 1) as f32) * CHECKPOINT_SPACING,
        mode,
        prompt,
        problem,
        reward_points: CHECKPOINT_REWARD_POINTS[index.min(TOTAL_CHECKPOINTS - 1)],
        gates,
        resolved: false,
        result: CheckpointResult::None,
        resolved_at_ms: 0.0,
        checkpoint_time_sec: 0.0,
    }
}

/// Correct gate gets the unique maximum across all gates
fn label_highest<R: Rng + ?Sized>(rng: &mut R, gates: &mut [Gate], correct: usize) {
    let top = rng.random_range(HIGHEST_CORRECT_MIN..=HIGHEST_CORRECT_MAX);
    gates[correct].label = top;

    for gate in gates.iter_mut().filter(|g| !g.is_correct) {
        let mut label = rng.random_range(HIGHEST_DISTRACTOR_MIN..=HIGHEST_DISTRACTOR_MAX);
        if label >= top {
            label = top - rng.random_range(2..=11);
        }
        gate.label = label;
    }
}

/// Distractors are distinct values in 0..=18, preferring answer ± 4
fn label_math<R: Rng + ?Sized>(rng: &mut R, gates: &mut [Gate], correct: usize, answer: u32) {
    gates[correct].label = answer;
    let mut used = vec![answer];

    for gate in gates.iter_mut().filter(|g| !g.is_correct) {
        let near = (0..MATH_NEAR_ATTEMPTS).find_map(|_| {
            let candidate =
                answer as i32 + rng.random_range(-MATH_NEAR_SPREAD..=MATH_NEAR_SPREAD);
            (0..=MATH_LABEL_MAX as i32)
                .contains(&candidate)
                .then_some(candidate as u32)
                .filter(|c| !used.contains(c))
        });

        let label = near.unwrap_or_else(|| {
            let free: Vec<u32> = (0..=MATH_LABEL_MAX).filter(|v| !used.contains(v)).collect();
            // 19 values, at most 4 used
            free.choose(rng).copied().unwrap_or(0)
        });

        used.push(label);
        gate.label = label;
    }
}
