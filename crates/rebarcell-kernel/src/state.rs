//! Machine state.
//!
//! `MachineState` is the single snapshot every view reads. It is `Copy`, so
//! transitions take it by value and hand back a new one without cloning
//! anything on the heap.

use rebarcell_types::{Alarm, ControlAuthority, DefectType, SupervisoryMode};
use serde::{Deserialize, Serialize};

/// Temperature the cell powers on at.
pub const AMBIENT_TEMP: f64 = 25.0;

/// Cut length the cell powers on with.
pub const DEFAULT_TARGET_LENGTH: f64 = 8.0;

/// Canonical snapshot of the cutting cell and its simulation context.
///
/// Only the kernel mutates it (via `apply_tick` and `apply_command`); the
/// fields are therefore crate-visible and exposed read-only through getters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineState {
    // Telemetry
    pub(crate) length: f64,
    pub(crate) temp: f64,
    pub(crate) count: u64,

    // Setpoints and operating flags
    pub(crate) target_length: f64,
    pub(crate) is_running: bool,
    pub(crate) is_auto: bool,

    // Fault injection
    pub(crate) alarm: Option<Alarm>,
    pub(crate) defect_type: DefectType,

    // Environment configuration, survives a reset
    pub(crate) control_authority: ControlAuthority,
    pub(crate) is_priority_enabled: bool,
    pub(crate) supervisory_mode: SupervisoryMode,
}

impl MachineState {
    /// Creates the power-on state.
    pub fn new() -> Self {
        Self {
            length: 0.0,
            temp: AMBIENT_TEMP,
            count: 0,
            target_length: DEFAULT_TARGET_LENGTH,
            is_running: false,
            is_auto: false,
            alarm: None,
            defect_type: DefectType::None,
            control_authority: ControlAuthority::Shared,
            is_priority_enabled: false,
            supervisory_mode: SupervisoryMode::Manual,
        }
    }

    /// Creates the power-on state under a specific environment.
    pub fn with_environment(
        control_authority: ControlAuthority,
        is_priority_enabled: bool,
        supervisory_mode: SupervisoryMode,
    ) -> Self {
        Self {
            control_authority,
            is_priority_enabled,
            supervisory_mode,
            ..Self::new()
        }
    }

    /// Material fed since the last cut.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Thermal load proxy.
    pub fn temp(&self) -> f64 {
        self.temp
    }

    /// Completed cuts since power-on or the last count reset.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// The cut-length setpoint.
    pub fn target_length(&self) -> f64 {
        self.target_length
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn is_auto(&self) -> bool {
        self.is_auto
    }

    pub fn alarm(&self) -> Option<Alarm> {
        self.alarm
    }

    pub fn defect_type(&self) -> DefectType {
        self.defect_type
    }

    /// Derived from `defect_type`, so the two can never disagree.
    pub fn is_defect_simulating(&self) -> bool {
        self.defect_type.is_active()
    }

    pub fn control_authority(&self) -> ControlAuthority {
        self.control_authority
    }

    pub fn is_priority_enabled(&self) -> bool {
        self.is_priority_enabled
    }

    pub fn supervisory_mode(&self) -> SupervisoryMode {
        self.supervisory_mode
    }

    /// Returns true if a blocking alarm is active and the current tier
    /// reacts to it (the motor is interlocked, auto-cut is suppressed).
    pub fn is_interlocked(&self) -> bool {
        self.supervisory_mode.blocks_on_alarm() && self.alarm.is_some_and(Alarm::is_blocking)
    }

    /// Returns true if the cutter runs hotter than `threshold`.
    ///
    /// Informational only; no scenario acts on temperature.
    pub fn is_overheated(&self, threshold: f64) -> bool {
        self.temp > threshold
    }

    /// Returns the state a reset produces: defaults everywhere except the
    /// environment configuration.
    pub(crate) fn reset(self) -> Self {
        Self::with_environment(
            self.control_authority,
            self.is_priority_enabled,
            self.supervisory_mode,
        )
    }

    // ========================================================================
    // Fixtures
    // ========================================================================

    #[cfg(test)]
    pub(crate) fn with_length(mut self, length: f64) -> Self {
        self.length = length;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_temp(mut self, temp: f64) -> Self {
        self.temp = temp;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_count(mut self, count: u64) -> Self {
        self.count = count;
        self
    }
}

impl Default for MachineState {
    fn default() -> Self {
        Self::new()
    }
}
