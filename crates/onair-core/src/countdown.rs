//! Countdown timer (e.g. a timed promotion)

use serde::{Deserialize, Serialize};

/// Outcome of one countdown tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownTick {
    /// No countdown is running
    Idle,
    /// Remaining seconds after the decrement
    Running(u32),
    /// The countdown sat at zero for a tick and is now cleared
    Expired,
}

/// A decrementing, self-clearing countdown
///
/// Zero is observable for exactly one tick before the timer clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CountdownTimer {
    pub remaining_seconds: Option<u32>,
}

impl CountdownTimer {
    /// Start (or restart) the countdown
    pub fn start(&mut self, minutes: u32) {
        self.remaining_seconds = Some(minutes.saturating_mul(60));
    }

    /// Advance by `step_secs`
    pub fn tick(&mut self, step_secs: u32) -> CountdownTick {
        match self.remaining_seconds {
            None => CountdownTick::Idle,
            Some(0) => {
                self.remaining_seconds = None;
                CountdownTick::Expired
            }
            Some(remaining) => {
                let next = remaining.saturating_sub(step_secs);
                self.remaining_seconds = Some(next);
                CountdownTick::Running(next)
            }
        }
    }
}
