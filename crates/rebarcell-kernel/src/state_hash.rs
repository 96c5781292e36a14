//! Deterministic state hashing for machine state.
//!
//! The hash is deterministic: same state → same hash. The simulation shell
//! uses it to verify that replaying a recorded session reproduces the
//! original run bit for bit.
//!
//! # Algorithm
//!
//! BLAKE3 over every field in declaration order. Floats are hashed by their
//! IEEE-754 bit pattern, so `0.1 + 0.2` and `0.3` hash differently, exactly
//! as the transition function would treat them differently.

use blake3::Hasher;
use rebarcell_types::{Alarm, ControlAuthority, DefectType, SupervisoryMode};

use crate::state::MachineState;

impl MachineState {
    /// Computes a deterministic hash of the whole snapshot.
    ///
    /// # Examples
    ///
    /// ```
    /// use rebarcell_kernel::MachineState;
    ///
    /// let state1 = MachineState::new();
    /// let state2 = MachineState::new();
    ///
    /// assert_eq!(state1.compute_state_hash(), state2.compute_state_hash());
    /// ```
    pub fn compute_state_hash(&self) -> [u8; 32] {
        let mut hasher = Hasher::new();

        // Telemetry
        hasher.update(&self.length.to_bits().to_le_bytes());
        hasher.update(&self.temp.to_bits().to_le_bytes());
        hasher.update(&self.count.to_le_bytes());

        // Setpoints and flags
        hasher.update(&self.target_length.to_bits().to_le_bytes());
        hasher.update(&[u8::from(self.is_running), u8::from(self.is_auto)]);

        // Fault injection
        hasher.update(&[alarm_tag(self.alarm), defect_tag(self.defect_type)]);

        // Environment
        hasher.update(&[
            authority_tag(self.control_authority),
            u8::from(self.is_priority_enabled),
            mode_tag(self.supervisory_mode),
        ]);

        *hasher.finalize().as_bytes()
    }
}

fn alarm_tag(alarm: Option<Alarm>) -> u8 {
    match alarm {
        None => 0,
        Some(Alarm::DimensionalTolerance) => 1,
        Some(Alarm::ControlConflict) => 2,
        Some(Alarm::OverrideBlocked) => 3,
        Some(Alarm::ConflictMiscut) => 4,
    }
}

fn defect_tag(defect: DefectType) -> u8 {
    match defect {
        DefectType::None => 0,
        DefectType::Length => 1,
        DefectType::Conflict => 2,
    }
}

fn authority_tag(authority: ControlAuthority) -> u8 {
    match authority {
        ControlAuthority::Local => 0,
        ControlAuthority::Remote => 1,
        ControlAuthority::Shared => 2,
    }
}

fn mode_tag(mode: SupervisoryMode) -> u8 {
    match mode {
        SupervisoryMode::Manual => 0,
        SupervisoryMode::Hmi => 1,
        SupervisoryMode::Scada => 2,
        SupervisoryMode::Mes => 3,
    }
}

#[cfg(test)]
mod tests {
    use rebarcell_types::CommandOrigin;

    use crate::{Command, ProcessParams, apply_command, apply_tick};

    use super::*;

    #[test]
    fn hash_is_repeatable() {
        let state = MachineState::new().with_length(3.2);
        assert_eq!(state.compute_state_hash(), state.compute_state_hash());
    }

    #[test]
    fn one_tick_changes_the_hash() {
        let (state, _) = apply_command(MachineState::new(), Command::start(CommandOrigin::Local))
            .expect("start should be accepted");
        let (ticked, _) = apply_tick(state, &ProcessParams::default());

        assert_ne!(state.compute_state_hash(), ticked.compute_state_hash());
    }

    #[test]
    fn environment_is_part_of_the_hash() {
        let a = MachineState::new();
        let b = MachineState::with_environment(
            ControlAuthority::Remote,
            false,
            SupervisoryMode::Manual,
        );
        assert_ne!(a.compute_state_hash(), b.compute_state_hash());
    }
}
