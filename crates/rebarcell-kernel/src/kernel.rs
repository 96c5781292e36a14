//! The kernel - command side of the functional core.
//!
//! `apply_command` validates a discrete command against the authority
//! arbiter and its own preconditions, then produces the next state and the
//! effects describing the change. A rejected command produces no state at
//! all; the caller keeps the state it already has.
//!
//! # Example
//!
//! ```
//! use rebarcell_kernel::{Command, KernelError, MachineState, apply_command};
//! use rebarcell_types::{CommandOrigin, ControlAuthority};
//!
//! let state = MachineState::new();
//! let (state, _) = apply_command(
//!     state,
//!     Command::set_control_authority(CommandOrigin::Local, ControlAuthority::Local),
//! )
//! .unwrap();
//!
//! let result = apply_command(state, Command::set_target_length(CommandOrigin::Remote, 6.0));
//! assert!(matches!(result, Err(KernelError::AuthorityDenied { .. })));
//! assert_eq!(state.target_length(), 8.0);
//! ```

use rebarcell_types::{Alarm, CommandOrigin, ControlAuthority, DefectType, SupervisoryMode};

use crate::authority::{authorize, validate_target_length};
use crate::command::{Action, Command};
use crate::effects::Effect;
use crate::state::MachineState;

/// Applies a command to the state, producing new state and effects.
///
/// Takes ownership of the state; `MachineState` is `Copy`, so callers that
/// need the old value on rejection simply keep their copy.
pub fn apply_command(
    state: MachineState,
    cmd: Command,
) -> Result<(MachineState, Vec<Effect>), KernelError> {
    // Precondition: the origin may perform this action
    authorize(&state, cmd.origin, &cmd.action)?;

    let mut effects = Vec::new();
    let mut next = state;

    match cmd.action {
        // ====================================================================
        // Controller Commands
        // ====================================================================
        Action::SetRunning(running) => {
            // Precondition: a blocking alarm keeps the motor down outside manual
            if running && !next.is_running {
                refuse_interlocked_start(&next)?;
            }

            if next.is_running != running {
                next.is_running = running;
                effects.push(Effect::RunningChanged(running));
            }
        }

        Action::SetAuto(enabled) => {
            if next.is_auto != enabled {
                next.is_auto = enabled;
                effects.push(Effect::AutoChanged(enabled));
            }
        }

        Action::SetTargetLength(length) => {
            // Precondition: setpoint is usable
            let length = validate_target_length(length)?;

            if next.target_length != length {
                effects.push(Effect::TargetLengthChanged {
                    from: next.target_length,
                    to: length,
                });
                next.target_length = length;
            }
        }

        Action::ResetCount => {
            effects.push(Effect::CountReset {
                previous: next.count,
            });
            next.count = 0;
        }

        Action::ManualCut => {
            let cut_length = next.length;
            next.length = 0.0;
            next.count = next.count.saturating_add(1);
            effects.push(Effect::ManualCutCompleted {
                count: next.count,
                cut_length,
            });
        }

        // ====================================================================
        // Safety
        // ====================================================================
        Action::EmergencyStop => {
            next.is_running = false;
            next.is_auto = false;
            effects.push(Effect::EmergencyStopped);
        }

        // ====================================================================
        // Fault Injection
        // ====================================================================
        Action::SelectDefectScenario(requested) => {
            select_scenario(&mut next, requested, &mut effects);

            // Postcondition: at most one scenario, no stale alarm
            debug_assert!(next.alarm.is_none());
        }

        // ====================================================================
        // Supervisory Configuration
        // ====================================================================
        Action::SetControlAuthority(authority) => {
            if next.control_authority != authority {
                next.control_authority = authority;
                effects.push(Effect::AuthorityChanged(authority));
            }
        }

        Action::SetPriorityEnabled(enabled) => {
            if next.is_priority_enabled != enabled {
                next.is_priority_enabled = enabled;
                effects.push(Effect::PriorityChanged(enabled));
            }
        }

        Action::SetSupervisoryMode(mode) => {
            apply_mode_posture(&mut next, mode, &mut effects);
        }

        Action::ResetSimulation => {
            if let Some(alarm) = next.alarm {
                effects.push(Effect::AlarmCleared(alarm));
            }
            if next.defect_type.is_active() {
                effects.push(Effect::ScenarioAborted(next.defect_type));
            }
            next = next.reset();
            effects.push(Effect::SimulationReset);

            // Postcondition: environment survives the reset
            debug_assert_eq!(next.control_authority, state.control_authority);
            debug_assert_eq!(next.is_priority_enabled, state.is_priority_enabled);
            debug_assert_eq!(next.supervisory_mode, state.supervisory_mode);
        }
    }

    // Postcondition: length never negative, target always usable
    debug_assert!(next.length >= 0.0);
    debug_assert!(next.target_length > 0.0);

    Ok((next, effects))
}

/// Selects, replaces or aborts a fault scenario.
///
/// Selecting the active scenario again (or `None`) is an explicit abort:
/// the scenario and its alarm are dropped whatever state they reached.
fn select_scenario(next: &mut MachineState, requested: DefectType, effects: &mut Vec<Effect>) {
    let current = next.defect_type;

    if let Some(alarm) = next.alarm.take() {
        effects.push(Effect::AlarmCleared(alarm));
    }
    if current.is_active() {
        effects.push(Effect::ScenarioAborted(current));
    }

    if requested == current || requested == DefectType::None {
        next.defect_type = DefectType::None;
    } else {
        next.defect_type = requested;
        effects.push(Effect::ScenarioSelected(requested));
    }
}

/// Switches tier and applies its operating posture: MES runs the line in
/// auto, the PLC-backed tiers enable auto, manual hands control back.
fn apply_mode_posture(next: &mut MachineState, mode: SupervisoryMode, effects: &mut Vec<Effect>) {
    if next.supervisory_mode != mode {
        next.supervisory_mode = mode;
        effects.push(Effect::SupervisoryModeChanged(mode));
    }

    let auto = mode != SupervisoryMode::Manual;
    if next.is_auto != auto {
        next.is_auto = auto;
        effects.push(Effect::AutoChanged(auto));
    }

    // An interlocked cell stays down until the fault is cleared.
    if mode == SupervisoryMode::Mes && !next.is_running && !next.is_interlocked() {
        next.is_running = true;
        effects.push(Effect::RunningChanged(true));
    }
}

fn refuse_interlocked_start(state: &MachineState) -> Result<(), KernelError> {
    match state.alarm.filter(|_| state.is_interlocked()) {
        Some(alarm) => Err(KernelError::Interlocked {
            alarm,
            mode: state.supervisory_mode,
        }),
        None => Ok(()),
    }
}

/// Reasons a command is rejected at the boundary.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum KernelError {
    #[error("{operation} from {origin} denied: control authority is {authority}")]
    AuthorityDenied {
        operation: &'static str,
        origin: CommandOrigin,
        authority: ControlAuthority,
    },

    #[error("target length must be a positive finite number, got {0}")]
    InvalidTargetLength(f64),

    #[error("motor start refused: {alarm} interlocks the cell in {mode} mode")]
    Interlocked { alarm: Alarm, mode: SupervisoryMode },
}
