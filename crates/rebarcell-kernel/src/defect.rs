//! Defect injector.
//!
//! Evaluated inside every tick while a scenario is active. Works on the
//! tentative next state (deltas already applied) and tells the transition
//! whether the auto-cut may run.

use rebarcell_types::{Alarm, DefectType};

use crate::effects::Effect;
use crate::params::ProcessParams;
use crate::state::MachineState;

/// What the transition should do after injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Injection {
    /// Continue with the cut check. `cut_blocking` suppresses it.
    Continue { cut_blocking: bool },
    /// The injector committed an atomic external write; the tick ends here.
    ShortCircuit,
}

/// Evolves the active scenario on the tentative state `next`.
pub(crate) fn inject(
    next: &mut MachineState,
    params: &ProcessParams,
    effects: &mut Vec<Effect>,
) -> Injection {
    match next.defect_type {
        DefectType::None => Injection::Continue {
            cut_blocking: false,
        },
        DefectType::Length => inject_length(next, params, effects),
        DefectType::Conflict => inject_conflict(next, params, effects),
    }
}

/// Dimensional defect: the cutter never fires, so the bar overshoots until
/// it crosses `target + margin`. The alarm is absorbing.
fn inject_length(
    next: &mut MachineState,
    params: &ProcessParams,
    effects: &mut Vec<Effect>,
) -> Injection {
    if next.length >= next.target_length + params.overshoot_margin {
        raise(next, Alarm::DimensionalTolerance, effects);
        if next.supervisory_mode.blocks_on_alarm() {
            stop_motor(next, Alarm::DimensionalTolerance, effects);
        }
    }

    Injection::Continue { cut_blocking: true }
}

/// Dual-controller race: a rogue remote write of the target arrives while
/// the bar is mid-cycle.
fn inject_conflict(
    next: &mut MachineState,
    params: &ProcessParams,
    effects: &mut Vec<Effect>,
) -> Injection {
    let protected = next.is_priority_enabled;
    let forced = params.forced_target_length;

    // Terminal outcome: the forced target was reached while unprotected.
    if !protected && next.target_length == forced && next.length >= forced {
        raise(next, Alarm::ConflictMiscut, effects);
        stop_motor(next, Alarm::ConflictMiscut, effects);
        return Injection::Continue { cut_blocking: true };
    }

    if params.in_conflict_window(next.length) {
        if !protected {
            if next.target_length != forced {
                effects.push(Effect::TargetOverridden {
                    from: next.target_length,
                    to: forced,
                });
                next.target_length = forced;
            }
            raise(next, Alarm::ControlConflict, effects);
            return Injection::ShortCircuit;
        }

        if next.alarm.is_none() {
            raise(next, Alarm::OverrideBlocked, effects);
        }
    }

    Injection::Continue {
        cut_blocking: !protected,
    }
}

/// Sets `alarm`, emitting effects only when it actually changes.
pub(crate) fn raise(next: &mut MachineState, alarm: Alarm, effects: &mut Vec<Effect>) {
    if next.alarm == Some(alarm) {
        return;
    }
    if let Some(previous) = next.alarm {
        effects.push(Effect::AlarmCleared(previous));
    }
    next.alarm = Some(alarm);
    effects.push(Effect::AlarmRaised(alarm));
}

/// Stops the motor on account of `alarm`, if it is running.
pub(crate) fn stop_motor(next: &mut MachineState, alarm: Alarm, effects: &mut Vec<Effect>) {
    if next.is_running {
        next.is_running = false;
        effects.push(Effect::MotorInterlocked(alarm));
    }
}

#[cfg(test)]
mod tests {
    use rebarcell_types::{ControlAuthority, SupervisoryMode};

    use super::*;

    fn conflict_state(priority: bool) -> MachineState {
        let mut state =
            MachineState::with_environment(ControlAuthority::Shared, priority, SupervisoryMode::Hmi);
        state.defect_type = DefectType::Conflict;
        state.is_running = true;
        state.is_auto = true;
        state
    }

    #[test]
    fn conflict_outside_window_is_quiet() {
        let mut next = conflict_state(false).with_length(1.0);
        let mut effects = Vec::new();

        let injection = inject(&mut next, &ProcessParams::default(), &mut effects);

        assert_eq!(injection, Injection::Continue { cut_blocking: true });
        assert!(next.alarm.is_none());
        assert!(effects.is_empty());
    }

    #[test]
    fn unprotected_override_short_circuits() {
        let mut next = conflict_state(false).with_length(2.5);
        let mut effects = Vec::new();

        let injection = inject(&mut next, &ProcessParams::default(), &mut effects);

        assert_eq!(injection, Injection::ShortCircuit);
        assert_eq!(next.target_length, 3.0);
        assert_eq!(next.alarm, Some(Alarm::ControlConflict));
        assert_eq!(
            effects,
            vec![
                Effect::TargetOverridden { from: 8.0, to: 3.0 },
                Effect::AlarmRaised(Alarm::ControlConflict),
            ]
        );
    }

    #[test]
    fn repeated_override_emits_nothing_new() {
        let mut next = conflict_state(false).with_length(2.5);
        let mut effects = Vec::new();
        inject(&mut next, &ProcessParams::default(), &mut effects);

        effects.clear();
        next.length = 2.6;
        let injection = inject(&mut next, &ProcessParams::default(), &mut effects);

        assert_eq!(injection, Injection::ShortCircuit);
        assert!(effects.is_empty());
    }

    #[test]
    fn protected_override_is_only_reported() {
        let mut next = conflict_state(true).with_length(2.5);
        let mut effects = Vec::new();

        let injection = inject(&mut next, &ProcessParams::default(), &mut effects);

        assert_eq!(injection, Injection::Continue { cut_blocking: false });
        assert_eq!(next.target_length, 8.0);
        assert_eq!(next.alarm, Some(Alarm::OverrideBlocked));
    }

    #[test]
    fn forced_target_reached_is_a_miscut() {
        let mut next = conflict_state(false).with_length(3.0);
        next.target_length = 3.0;
        next.alarm = Some(Alarm::ControlConflict);
        let mut effects = Vec::new();

        inject(&mut next, &ProcessParams::default(), &mut effects);

        assert_eq!(next.alarm, Some(Alarm::ConflictMiscut));
        assert!(!next.is_running);
        assert!(effects.contains(&Effect::AlarmCleared(Alarm::ControlConflict)));
        assert!(effects.contains(&Effect::MotorInterlocked(Alarm::ConflictMiscut)));
    }

    #[test]
    fn length_overshoot_stops_motor_outside_manual() {
        let mut next = conflict_state(false).with_length(9.5);
        next.defect_type = DefectType::Length;
        let mut effects = Vec::new();

        let injection = inject(&mut next, &ProcessParams::default(), &mut effects);

        assert_eq!(injection, Injection::Continue { cut_blocking: true });
        assert_eq!(next.alarm, Some(Alarm::DimensionalTolerance));
        assert!(!next.is_running);
    }

    #[test]
    fn length_overshoot_keeps_running_in_manual() {
        let mut next = conflict_state(false).with_length(9.5);
        next.defect_type = DefectType::Length;
        next.supervisory_mode = SupervisoryMode::Manual;
        let mut effects = Vec::new();

        inject(&mut next, &ProcessParams::default(), &mut effects);

        assert_eq!(next.alarm, Some(Alarm::DimensionalTolerance));
        assert!(next.is_running);
    }
}
