//! Effects produced by the kernel.
//!
//! Effects describe what a tick or command did. The kernel is pure - it
//! produces effects but never publishes or logs them; the session in
//! `rebarcell-sim` fans them out to subscribers.

use rebarcell_types::{Alarm, ControlAuthority, DefectType, SupervisoryMode};
use serde::{Deserialize, Serialize};

/// Something observable that happened during a transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Effect {
    // ========================================================================
    // Process Effects
    // ========================================================================
    /// The auto-cut completed a bar.
    CutCompleted {
        /// Counter value after the cut.
        count: u64,
        /// Length of the bar that was cut.
        cut_length: f64,
    },

    /// The operator cut a bar by hand.
    ManualCutCompleted { count: u64, cut_length: f64 },

    /// The motor was stopped because of an alarm.
    MotorInterlocked(Alarm),

    // ========================================================================
    // Fault Effects
    // ========================================================================
    AlarmRaised(Alarm),

    AlarmCleared(Alarm),

    /// An unprotected remote write replaced the target setpoint.
    TargetOverridden { from: f64, to: f64 },

    ScenarioSelected(DefectType),

    /// A scenario was switched off before (or instead of) resolving.
    ScenarioAborted(DefectType),

    // ========================================================================
    // Command Effects
    // ========================================================================
    RunningChanged(bool),

    AutoChanged(bool),

    TargetLengthChanged { from: f64, to: f64 },

    CountReset { previous: u64 },

    EmergencyStopped,

    AuthorityChanged(ControlAuthority),

    PriorityChanged(bool),

    SupervisoryModeChanged(SupervisoryMode),

    SimulationReset,
}
