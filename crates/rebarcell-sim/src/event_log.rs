//! Input recording for deterministic replay.
//!
//! The transition function is pure, so a run is fully determined by its
//! starting snapshot, its parameters and the position of each command
//! between ticks. The event log captures exactly that; replaying it must
//! land on the same final state hash.
//!
//! Recordings live in memory. [`Recording::to_json`] exports one for
//! attaching to a bug report.

use rebarcell_kernel::{Command, MachineState, ProcessParams, apply_command, apply_tick};
use serde::{Deserialize, Serialize};

use crate::SimError;

// ============================================================================
// Logged Inputs
// ============================================================================

/// A command and where it landed in the tick sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedCommand {
    /// Ticks elapsed since recording started when the command arrived.
    pub tick: u64,
    pub command: Command,
    /// Whether the kernel accepted it.
    pub applied: bool,
}

// ============================================================================
// Event Log
// ============================================================================

/// An in-progress recording, owned by the session.
#[derive(Debug, Clone)]
pub struct EventLog {
    initial: MachineState,
    params: ProcessParams,
    start_tick: u64,
    commands: Vec<LoggedCommand>,
}

impl EventLog {
    /// Starts a log at the session's current snapshot.
    pub fn begin(initial: MachineState, params: ProcessParams, start_tick: u64) -> Self {
        Self {
            initial,
            params,
            start_tick,
            commands: Vec::new(),
        }
    }

    /// Records a command submitted at absolute tick `tick`.
    pub fn record(&mut self, tick: u64, command: Command, applied: bool) {
        debug_assert!(tick >= self.start_tick);
        self.commands.push(LoggedCommand {
            tick: tick - self.start_tick,
            command,
            applied,
        });
    }

    /// Number of commands recorded so far.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Seals the log at absolute tick `end_tick` with the session's final snapshot.
    pub fn finish(self, end_tick: u64, final_state: &MachineState) -> Recording {
        Recording {
            initial: self.initial,
            params: self.params,
            commands: self.commands,
            ticks: end_tick - self.start_tick,
            final_hash: final_state.compute_state_hash(),
        }
    }
}

// ============================================================================
// Recording
// ============================================================================

/// A sealed recording that can be replayed and verified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    pub initial: MachineState,
    pub params: ProcessParams,
    pub commands: Vec<LoggedCommand>,
    /// Total ticks covered by the recording.
    pub ticks: u64,
    /// State hash at the end of the recorded run.
    pub final_hash: [u8; 32],
}

impl Recording {
    /// Re-executes the recorded inputs against the kernel.
    ///
    /// Returns the reproduced final state, or `ReplayDivergence` if any
    /// command's acceptance differs or the final hash does not match.
    pub fn replay(&self) -> Result<MachineState, SimError> {
        let mut state = self.initial;
        let mut tick = 0;

        for logged in &self.commands {
            if logged.tick < tick || logged.tick > self.ticks {
                return Err(SimError::ReplayDivergence {
                    tick: logged.tick,
                    reason: "command out of order".to_string(),
                });
            }
            while tick < logged.tick {
                state = apply_tick(state, &self.params).0;
                tick += 1;
            }

            let applied = match apply_command(state, logged.command) {
                Ok((next, _)) => {
                    state = next;
                    true
                }
                Err(_) => false,
            };
            if applied != logged.applied {
                return Err(SimError::ReplayDivergence {
                    tick,
                    reason: format!(
                        "{} was {} when recorded",
                        logged.command.action.name(),
                        if logged.applied { "applied" } else { "rejected" }
                    ),
                });
            }
        }

        while tick < self.ticks {
            state = apply_tick(state, &self.params).0;
            tick += 1;
        }

        if state.compute_state_hash() != self.final_hash {
            return Err(SimError::ReplayDivergence {
                tick,
                reason: "final state hash differs".to_string(),
            });
        }

        Ok(state)
    }

    /// Encodes the recording as JSON.
    pub fn to_json(&self) -> Result<String, SimError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes a recording produced by [`Recording::to_json`].
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        Ok(serde_json::from_str(json)?)
    }
}
