//! The transition function.
//!
//! `apply_tick` advances the cell by exactly one period. It is pure: the
//! same state and parameters always produce the same next state and effects.

use crate::defect::{self, Injection};
use crate::effects::Effect;
use crate::params::ProcessParams;
use crate::state::MachineState;

/// Advances `state` by one tick.
///
/// Steps, in order:
/// 1. Physical deltas (feed, heat) if the motor runs.
/// 2. Defect injection if a scenario is active; may short-circuit.
/// 3. Auto-cut when enabled, the target is reached, the tick is not
///    cut-blocking and no alarm interlocks the cell.
/// 4. Alarm interlock: a blocking alarm stops the motor outside manual mode.
pub fn apply_tick(state: MachineState, params: &ProcessParams) -> (MachineState, Vec<Effect>) {
    let mut effects = Vec::new();

    // Idle cell: nothing moves, nothing to evaluate.
    if !state.is_running && !state.is_defect_simulating() {
        return (state, effects);
    }

    let mut next = state;
    if state.is_running {
        next.length += params.feed_rate;
        next.temp += params.heat_rate;
    }

    let mut cut_blocking = false;
    if next.is_defect_simulating() {
        match defect::inject(&mut next, params, &mut effects) {
            Injection::ShortCircuit => {
                debug_assert_eq!(next.count, state.count);
                return (next, effects);
            }
            Injection::Continue { cut_blocking: blocking } => cut_blocking = blocking,
        }
    }

    let interlocked = next.is_interlocked();

    if !interlocked && !cut_blocking && next.is_auto && next.length >= next.target_length {
        let cut_length = next.length;
        next.length = 0.0;
        next.count = next.count.saturating_add(1);
        next.temp += params.cut_heat_bump;
        effects.push(Effect::CutCompleted {
            count: next.count,
            cut_length,
        });
    }

    if let Some(alarm) = next.alarm.filter(|_| interlocked) {
        defect::stop_motor(&mut next, alarm, &mut effects);
    }

    // Postcondition: the tick path never loses a cut
    assert!(
        next.count >= state.count,
        "count decreased across a tick: {} -> {}",
        state.count,
        next.count
    );
    // Postcondition: length is never negative
    debug_assert!(next.length >= 0.0);

    (next, effects)
}
