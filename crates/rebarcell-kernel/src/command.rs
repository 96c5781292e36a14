//! Commands that can be submitted to the kernel.
//!
//! Every command carries the [`CommandOrigin`] it was issued from. Setpoint
//! and operating commands are arbitrated against the current control
//! authority; configuration and fault-injection commands are not.

use rebarcell_types::{CommandOrigin, ControlAuthority, DefectType, SupervisoryMode};
use serde::{Deserialize, Serialize};

/// A discrete, origin-tagged mutation request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub origin: CommandOrigin,
    pub action: Action,
}

/// What a command asks the cell to do.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Action {
    // ====================================================================
    // Controller commands (arbitrated)
    // ====================================================================
    /// Start or stop the feed motor.
    SetRunning(bool),
    /// Enable or disable cut-on-reach-target logic.
    SetAuto(bool),
    /// Change the cut-length setpoint. Must be finite and positive.
    SetTargetLength(f64),
    /// Zero the cut counter.
    ResetCount,
    /// Operator cut button: completes a cut at the current length.
    ManualCut,

    // ====================================================================
    // Safety
    // ====================================================================
    /// Stop the motor and drop out of auto from either controller.
    EmergencyStop,

    // ====================================================================
    // Fault injection (meta)
    // ====================================================================
    /// Select a scenario; selecting the active one again aborts it.
    SelectDefectScenario(DefectType),

    // ====================================================================
    // Supervisory configuration
    // ====================================================================
    SetControlAuthority(ControlAuthority),
    SetPriorityEnabled(bool),
    /// Switch control tier and apply that tier's operating posture.
    SetSupervisoryMode(SupervisoryMode),
    /// Restore power-on defaults, keeping the environment configuration.
    ResetSimulation,
}

impl Action {
    /// Returns true if the action must pass the authority arbiter.
    pub fn is_guarded(&self) -> bool {
        matches!(
            self,
            Action::SetRunning(_)
                | Action::SetAuto(_)
                | Action::SetTargetLength(_)
                | Action::ResetCount
                | Action::ManualCut
        )
    }

    /// Stable name used in rejection reasons and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Action::SetRunning(_) => "set_running",
            Action::SetAuto(_) => "set_auto",
            Action::SetTargetLength(_) => "set_target_length",
            Action::ResetCount => "reset_count",
            Action::ManualCut => "manual_cut",
            Action::EmergencyStop => "emergency_stop",
            Action::SelectDefectScenario(_) => "select_defect_scenario",
            Action::SetControlAuthority(_) => "set_control_authority",
            Action::SetPriorityEnabled(_) => "set_priority_enabled",
            Action::SetSupervisoryMode(_) => "set_supervisory_mode",
            Action::ResetSimulation => "reset_simulation",
        }
    }
}

impl Command {
    pub fn new(origin: CommandOrigin, action: Action) -> Self {
        Self { origin, action }
    }

    pub fn local(action: Action) -> Self {
        Self::new(CommandOrigin::Local, action)
    }

    pub fn remote(action: Action) -> Self {
        Self::new(CommandOrigin::Remote, action)
    }

    pub fn start(origin: CommandOrigin) -> Self {
        Self::new(origin, Action::SetRunning(true))
    }

    pub fn stop(origin: CommandOrigin) -> Self {
        Self::new(origin, Action::SetRunning(false))
    }

    pub fn set_auto(origin: CommandOrigin, enabled: bool) -> Self {
        Self::new(origin, Action::SetAuto(enabled))
    }

    pub fn set_target_length(origin: CommandOrigin, length: f64) -> Self {
        Self::new(origin, Action::SetTargetLength(length))
    }

    pub fn reset_count(origin: CommandOrigin) -> Self {
        Self::new(origin, Action::ResetCount)
    }

    pub fn select_defect(origin: CommandOrigin, defect: DefectType) -> Self {
        Self::new(origin, Action::SelectDefectScenario(defect))
    }

    pub fn set_control_authority(origin: CommandOrigin, authority: ControlAuthority) -> Self {
        Self::new(origin, Action::SetControlAuthority(authority))
    }

    pub fn set_priority_enabled(origin: CommandOrigin, enabled: bool) -> Self {
        Self::new(origin, Action::SetPriorityEnabled(enabled))
    }

    pub fn set_supervisory_mode(origin: CommandOrigin, mode: SupervisoryMode) -> Self {
        Self::new(origin, Action::SetSupervisoryMode(mode))
    }

    pub fn reset_simulation(origin: CommandOrigin) -> Self {
        Self::new(origin, Action::ResetSimulation)
    }
}
