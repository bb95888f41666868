//! End-of-run leaderboard card
//!
//! A plain snapshot of a finished run for the results screen. Nothing is stored
//! between sessions.

use serde::{Deserialize, Serialize};

use crate::sim::{RaceState, RaceStatus, RunOutcome};

/// Results for one finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    /// Total race time in milliseconds
    pub total_time_ms: f64,
    pub points: u32,
    pub average_speed: f32,
    pub lives_left: u8,
    pub checkpoints_covered: usize,
    pub total_checkpoints: usize,
}

impl RunSummary {
    /// Snapshot `state`; `None` until the run has ended
    pub fn from_state(state: &RaceState) -> Option<Self> {
        if state.status != RaceStatus::Ended {
            return None;
        }

        // Sum of checkpoint times, or wall time when nothing was timed
        let timed_ms = (state.total_time_sec * 1000.0).round();
        let total_time_ms = if timed_ms > 0.0 {
            timed_ms
        } else {
            state.elapsed_ms
        };

        Some(Self {
            outcome: state.outcome,
            total_time_ms,
            points: state.total_points,
            average_speed: state.average_speed,
            lives_left: state.lives,
            checkpoints_covered: state.checkpoints_covered,
            total_checkpoints: state.total_checkpoints(),
        })
    }

    pub fn title(&self) -> &'static str {
        match self.outcome {
            RunOutcome::Completed => "Run Complete",
            _ => "Run Failed",
        }
    }

    /// Card lines in display order
    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("Total Time: {}", format_race_time(self.total_time_ms)),
            format!("Final Points: {}", self.points),
            format!("Avg Speed: {:.1}", self.average_speed),
            format!("Lives Remaining: {}", self.lives_left),
            format!(
                "Checkpoints: {} / {}",
                self.checkpoints_covered, self.total_checkpoints
            ),
        ]
    }
}

/// Format milliseconds as `MM:SS.cc`
pub fn format_race_time(ms: f64) -> String {
    let ms = ms.max(0.0);
    let total_seconds = (ms / 1000.0).floor() as u64;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    let centis = ((ms % 1000.0) / 10.0).floor() as u64;
    format!("{:02}:{:02}.{:02}", minutes, seconds, centis)
}
