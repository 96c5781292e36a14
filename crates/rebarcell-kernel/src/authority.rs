//! Authority arbiter.
//!
//! Only one controller may mutate setpoints at a time unless the cell is in
//! shared authority. Denials are reported to the caller and never queued.

use rebarcell_types::CommandOrigin;

use crate::command::Action;
use crate::kernel::KernelError;
use crate::state::MachineState;

/// Checks whether `origin` may perform `action` against `state`.
///
/// Unguarded actions (fault injection, configuration, reset, e-stop) are
/// always granted.
pub fn authorize(
    state: &MachineState,
    origin: CommandOrigin,
    action: &Action,
) -> Result<(), KernelError> {
    if !action.is_guarded() || state.control_authority.permits(origin) {
        return Ok(());
    }

    Err(KernelError::AuthorityDenied {
        operation: action.name(),
        origin,
        authority: state.control_authority,
    })
}

/// Rejects setpoints the cell cannot run with.
pub(crate) fn validate_target_length(length: f64) -> Result<f64, KernelError> {
    if length.is_finite() && length > 0.0 {
        Ok(length)
    } else {
        Err(KernelError::InvalidTargetLength(length))
    }
}

#[cfg(test)]
mod tests {
    use rebarcell_types::{ControlAuthority, DefectType, SupervisoryMode};

    use super::*;

    fn state_under(authority: ControlAuthority) -> MachineState {
        MachineState::with_environment(authority, false, SupervisoryMode::Hmi)
    }

    #[test]
    fn remote_write_denied_under_local_authority() {
        let state = state_under(ControlAuthority::Local);
        let result = authorize(
            &state,
            CommandOrigin::Remote,
            &Action::SetTargetLength(6.0),
        );

        assert!(matches!(
            result,
            Err(KernelError::AuthorityDenied {
                operation: "set_target_length",
                origin: CommandOrigin::Remote,
                authority: ControlAuthority::Local,
            })
        ));
    }

    #[test]
    fn local_write_denied_under_remote_authority() {
        let state = state_under(ControlAuthority::Remote);
        assert!(authorize(&state, CommandOrigin::Local, &Action::ResetCount).is_err());
        assert!(authorize(&state, CommandOrigin::Remote, &Action::ResetCount).is_ok());
    }

    #[test]
    fn meta_operations_bypass_the_arbiter() {
        let state = state_under(ControlAuthority::Local);
        for action in [
            Action::SelectDefectScenario(DefectType::Conflict),
            Action::SetControlAuthority(ControlAuthority::Remote),
            Action::SetPriorityEnabled(true),
            Action::SetSupervisoryMode(SupervisoryMode::Scada),
            Action::ResetSimulation,
            Action::EmergencyStop,
        ] {
            assert!(
                authorize(&state, CommandOrigin::Remote, &action).is_ok(),
                "{} should not be arbitrated",
                action.name()
            );
        }
    }

    #[test]
    fn target_length_must_be_positive_and_finite() {
        assert!(validate_target_length(8.0).is_ok());
        assert!(validate_target_length(0.0).is_err());
        assert!(validate_target_length(-1.0).is_err());
        assert!(validate_target_length(f64::NAN).is_err());
        assert!(validate_target_length(f64::INFINITY).is_err());
    }
}
