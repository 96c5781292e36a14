//! Invariant checking for simulation runs.
//!
//! The checker looks at every step of a run from the outside: the snapshot
//! before, the input, the snapshot after. It shares no code with the kernel
//! beyond the types, so a kernel bug cannot hide itself from the check.

use rebarcell_kernel::{Action, Command, Effect, MachineState};
use rebarcell_types::Alarm;

use crate::SimError;
use crate::session::CommandOutcome;

// ============================================================================
// Invariant Result
// ============================================================================

/// Result of an invariant check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantResult {
    /// The invariant holds.
    Ok,
    /// The invariant is violated.
    Violated {
        /// Name of the violated invariant.
        invariant: &'static str,
        /// Description of the violation.
        message: String,
    },
}

impl InvariantResult {
    /// Returns true if the invariant holds.
    pub fn is_ok(&self) -> bool {
        matches!(self, InvariantResult::Ok)
    }

    /// Converts to a `SimError` if violated.
    pub fn into_error(self, tick: u64) -> Option<SimError> {
        match self {
            InvariantResult::Ok => None,
            InvariantResult::Violated { invariant, message } => {
                Some(SimError::InvariantViolation {
                    invariant,
                    message,
                    tick,
                })
            }
        }
    }

    fn violated(invariant: &'static str, message: impl Into<String>) -> Self {
        InvariantResult::Violated {
            invariant,
            message: message.into(),
        }
    }
}

/// Returns early with a violation when `$cond` is false.
macro_rules! ensure {
    ($cond:expr, $invariant:literal, $($fmt:tt)+) => {
        if !$cond {
            return InvariantResult::violated($invariant, format!($($fmt)+));
        }
    };
}

// ============================================================================
// State Invariant Checker
// ============================================================================

/// Verifies machine-state invariants across ticks and commands.
#[derive(Debug, Default)]
pub struct StateInvariantChecker {
    checks: u64,
}

impl StateInvariantChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of steps checked so far.
    pub fn checks_run(&self) -> u64 {
        self.checks
    }

    /// Invariants every snapshot satisfies.
    pub fn check_snapshot(state: &MachineState) -> InvariantResult {
        ensure!(
            state.length().is_finite() && state.length() >= 0.0,
            "length_non_negative",
            "length is {}",
            state.length()
        );
        ensure!(
            state.target_length().is_finite() && state.target_length() > 0.0,
            "target_positive",
            "target length is {}",
            state.target_length()
        );
        ensure!(
            state.is_defect_simulating() == state.defect_type().is_active(),
            "defect_flag_matches_type",
            "simulating={} type={}",
            state.is_defect_simulating(),
            state.defect_type()
        );
        ensure!(
            state.alarm().is_none() || state.is_defect_simulating(),
            "alarm_requires_scenario",
            "alarm {:?} with no active scenario",
            state.alarm()
        );
        InvariantResult::Ok
    }

    /// Checks one tick.
    pub fn check_tick(
        &mut self,
        before: &MachineState,
        after: &MachineState,
        effects: &[Effect],
    ) -> InvariantResult {
        self.checks += 1;

        let snapshot = Self::check_snapshot(after);
        if !snapshot.is_ok() {
            return snapshot;
        }

        if !before.is_running() && !before.is_defect_simulating() {
            ensure!(
                before == after && effects.is_empty(),
                "idle_tick_is_no_op",
                "idle tick changed {before:?} into {after:?}"
            );
            return InvariantResult::Ok;
        }

        let cuts = effects
            .iter()
            .filter(|effect| matches!(effect, Effect::CutCompleted { .. }))
            .count() as u64;
        ensure!(
            after.count() == before.count() + cuts && cuts <= 1,
            "count_follows_cuts",
            "count {} -> {} with {cuts} cut(s)",
            before.count(),
            after.count()
        );

        if before.is_running() {
            ensure!(
                after.temp() >= before.temp(),
                "temp_non_decreasing_while_running",
                "temp {} -> {}",
                before.temp(),
                after.temp()
            );
        } else if cuts == 0 {
            ensure!(
                after.length() == before.length() && after.temp() == before.temp(),
                "stopped_motor_feeds_nothing",
                "length {} -> {}, temp {} -> {}",
                before.length(),
                after.length(),
                before.temp(),
                after.temp()
            );
        }

        if before.is_priority_enabled() {
            ensure!(
                after.target_length() == before.target_length(),
                "priority_protects_target",
                "target {} -> {} while protected",
                before.target_length(),
                after.target_length()
            );
        }

        // An override tick ends before the interlock runs.
        if after.is_interlocked() && after.alarm() != Some(Alarm::ControlConflict) {
            ensure!(
                !after.is_running(),
                "interlock_stops_motor",
                "running with {:?} in {} mode",
                after.alarm(),
                after.supervisory_mode()
            );
        }

        ensure!(
            after.control_authority() == before.control_authority()
                && after.is_priority_enabled() == before.is_priority_enabled()
                && after.supervisory_mode() == before.supervisory_mode()
                && after.defect_type() == before.defect_type(),
            "tick_preserves_configuration",
            "tick changed configuration of {before:?}"
        );

        InvariantResult::Ok
    }

    /// Checks one submitted command.
    pub fn check_command(
        &mut self,
        before: &MachineState,
        cmd: &Command,
        outcome: &CommandOutcome,
        after: &MachineState,
    ) -> InvariantResult {
        self.checks += 1;

        let snapshot = Self::check_snapshot(after);
        if !snapshot.is_ok() {
            return snapshot;
        }

        if outcome.is_rejected() {
            ensure!(
                before == after,
                "rejection_leaves_state",
                "rejected {} changed the snapshot",
                cmd.action.name()
            );
            return InvariantResult::Ok;
        }

        if cmd.action.is_guarded() {
            ensure!(
                before.control_authority().permits(cmd.origin),
                "authority_guard",
                "{} from {} applied under {} authority",
                cmd.action.name(),
                cmd.origin,
                before.control_authority()
            );
        }

        if !before.is_running() && after.is_running() {
            ensure!(
                !after.is_interlocked(),
                "interlock_refuses_start",
                "{} started the motor under {:?}",
                cmd.action.name(),
                after.alarm()
            );
        }

        match cmd.action {
            Action::ResetCount => {
                ensure!(after.count() == 0, "reset_count", "count is {}", after.count());
            }
            Action::ResetSimulation => {
                ensure!(
                    *after
                        == MachineState::with_environment(
                            before.control_authority(),
                            before.is_priority_enabled(),
                            before.supervisory_mode(),
                        ),
                    "reset_restores_defaults",
                    "reset produced {after:?}"
                );
            }
            Action::SelectDefectScenario(_) => {
                ensure!(
                    after.alarm().is_none(),
                    "selection_clears_alarm",
                    "alarm {:?} survived scenario selection",
                    after.alarm()
                );
            }
            _ => {
                ensure!(
                    after.count() >= before.count(),
                    "count_monotonic",
                    "{} decreased count {} -> {}",
                    cmd.action.name(),
                    before.count(),
                    after.count()
                );
            }
        }

        InvariantResult::Ok
    }
}
