//! 3-2-1-GO sequencer
//!
//! A stored schedule polled with the host clock. Nothing here sleeps or holds
//! a timer; the owner drops the schedule when the race leaves the countdown.

/// Interval between countdown labels
pub const COUNTDOWN_STEP_MS: f64 = 1000.0;
/// Delay between showing GO and starting the run
pub const LAUNCH_DELAY_MS: f64 = 450.0;

const STEPS: [(u8, &str); 4] = [(3, "3"), (2, "2"), (1, "1"), (0, "GO")];

/// Something the countdown wants applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStep {
    /// Display a label (`value` 0 is GO)
    Show { value: u8, label: &'static str },
    /// Start the run
    Launch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Countdown {
    started_at_ms: f64,
    shown: usize,
    launched: bool,
}

impl Countdown {
    pub fn new(now_ms: f64) -> Self {
        Self {
            started_at_ms: now_ms,
            shown: 0,
            launched: false,
        }
    }

    /// Next due step at `now_ms`, if any. Call repeatedly until `None`.
    pub fn poll(&mut self, now_ms: f64) -> Option<CountdownStep> {
        if let Some(&(value, label)) = STEPS.get(self.shown) {
            let due = self.started_at_ms + self.shown as f64 * COUNTDOWN_STEP_MS;
            if now_ms < due {
                return None;
            }
            self.shown += 1;
            return Some(CountdownStep::Show { value, label });
        }

        let launch_at = self.launch_at_ms();
        if !self.launched && now_ms >= launch_at {
            self.launched = true;
            return Some(CountdownStep::Launch);
        }
        None
    }

    pub fn launch_at_ms(&self) -> f64 {
        self.started_at_ms + (STEPS.len() - 1) as f64 * COUNTDOWN_STEP_MS + LAUNCH_DELAY_MS
    }
}
