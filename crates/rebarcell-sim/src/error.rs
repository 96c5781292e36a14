//! Error types for the simulation shell.

use thiserror::Error;

/// Errors raised by the session, scheduler and replay.
///
/// Simulated faults are never errors; they are alarms in the machine state.
#[derive(Debug, Error)]
pub enum SimError {
    /// Another thread panicked while holding the shared session.
    #[error("session lock poisoned")]
    SessionPoisoned,

    /// A scheduler was asked to tick with a zero period.
    #[error("tick period must be non-zero, got {0:?}")]
    InvalidTickPeriod(std::time::Duration),

    /// Replaying a recording did not reproduce the recorded run.
    #[error("replay diverged at tick {tick}: {reason}")]
    ReplayDivergence { tick: u64, reason: String },

    /// A state invariant failed during a checked run.
    #[error("invariant '{invariant}' violated at tick {tick}: {message}")]
    InvariantViolation {
        invariant: &'static str,
        message: String,
        tick: u64,
    },

    /// A recording could not be encoded or decoded.
    #[error("recording serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
