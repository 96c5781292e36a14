//! Process parameters.
//!
//! Increments are per tick, not per second: a tick always advances the cell
//! by exactly one period's worth of motion regardless of wall-clock jitter.

use serde::{Deserialize, Serialize};

/// Physical increments and fault thresholds consumed by the transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessParams {
    /// Length fed per tick while running.
    pub feed_rate: f64,
    /// Temperature gained per tick while running.
    pub heat_rate: f64,
    /// Temperature gained per completed auto-cut.
    pub cut_heat_bump: f64,
    /// How far past the target the length scenario lets a bar run before alarming.
    pub overshoot_margin: f64,
    /// Exclusive lower bound of the conflict override window.
    pub conflict_window_low: f64,
    /// Exclusive upper bound of the conflict override window.
    pub conflict_window_high: f64,
    /// Target the rogue remote controller tries to write.
    pub forced_target_length: f64,
    /// Display threshold for [`crate::MachineState::is_overheated`].
    pub overheat_threshold: f64,
}

impl ProcessParams {
    /// Returns true if `length` lies strictly inside the conflict window.
    pub fn in_conflict_window(&self, length: f64) -> bool {
        length > self.conflict_window_low && length < self.conflict_window_high
    }
}

impl Default for ProcessParams {
    fn default() -> Self {
        Self {
            feed_rate: 0.05,
            heat_rate: 0.01,
            cut_heat_bump: 0.5,
            overshoot_margin: 1.5,
            conflict_window_low: 2.0,
            conflict_window_high: 4.0,
            forced_target_length: 3.0,
            overheat_threshold: 40.0,
        }
    }
}
