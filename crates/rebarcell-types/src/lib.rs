//! # rebarcell-types: Core types for the rebar-cutting cell
//!
//! This crate contains the small vocabulary shared by the kernel, the
//! configuration layer and the simulation shell:
//! - Arbitration ([`ControlAuthority`], [`CommandOrigin`])
//! - Supervisory tiers ([`SupervisoryMode`])
//! - Fault injection ([`DefectType`], [`Alarm`])
//!
//! Everything here is `Copy` and serializes in `kebab-case` so the same
//! spelling works in TOML config files and JSON snapshots.

use std::fmt::{Debug, Display};

use serde::{Deserialize, Serialize};

// ============================================================================
// Arbitration
// ============================================================================

/// Which logical controller may currently mutate operating setpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControlAuthority {
    /// Only the local operator panel (HMI/button box).
    Local,
    /// Only the remote supervisory system (SCADA).
    Remote,
    /// Both controllers may write. Racy, used to demonstrate conflicts.
    #[default]
    Shared,
}

impl ControlAuthority {
    /// Returns true if a command from `origin` may mutate setpoints.
    pub fn permits(self, origin: CommandOrigin) -> bool {
        match self {
            ControlAuthority::Shared => true,
            ControlAuthority::Local => origin == CommandOrigin::Local,
            ControlAuthority::Remote => origin == CommandOrigin::Remote,
        }
    }
}

impl Display for ControlAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlAuthority::Local => write!(f, "local"),
            ControlAuthority::Remote => write!(f, "remote"),
            ControlAuthority::Shared => write!(f, "shared"),
        }
    }
}

/// The actor a command was issued by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandOrigin {
    Local,
    Remote,
}

impl Display for CommandOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandOrigin::Local => write!(f, "local"),
            CommandOrigin::Remote => write!(f, "remote"),
        }
    }
}

// ============================================================================
// Supervisory Mode
// ============================================================================

/// The control tier the cell is being demonstrated under.
///
/// The core only reads this through [`SupervisoryMode::blocks_on_alarm`];
/// everything else about a tier is presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SupervisoryMode {
    /// Button box, a human reacts to alarms by hand.
    #[default]
    Manual,
    /// Local touch panel with PLC logic.
    Hmi,
    /// Remote supervisory control.
    Scada,
    /// Production execution reporting on top of SCADA.
    Mes,
}

impl SupervisoryMode {
    /// All tiers, lowest to highest.
    pub const ALL: [SupervisoryMode; 4] = [
        SupervisoryMode::Manual,
        SupervisoryMode::Hmi,
        SupervisoryMode::Scada,
        SupervisoryMode::Mes,
    ];

    /// Capability table: whether an active alarm stops the motor and
    /// suppresses automatic cutting in this tier.
    ///
    /// | mode   | blocks on alarm |
    /// |--------|-----------------|
    /// | manual | no              |
    /// | hmi    | yes             |
    /// | scada  | yes             |
    /// | mes    | yes             |
    pub const fn blocks_on_alarm(self) -> bool {
        !matches!(self, SupervisoryMode::Manual)
    }
}

impl Display for SupervisoryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SupervisoryMode::Manual => write!(f, "manual"),
            SupervisoryMode::Hmi => write!(f, "hmi"),
            SupervisoryMode::Scada => write!(f, "scada"),
            SupervisoryMode::Mes => write!(f, "mes"),
        }
    }
}

// ============================================================================
// Fault Injection
// ============================================================================

/// Selectable fault-injection scenario. At most one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DefectType {
    #[default]
    None,
    /// Dimensional defect: the bar overshoots its cut length.
    Length,
    /// Dual-controller race on the target-length setpoint.
    Conflict,
}

impl DefectType {
    pub fn is_active(self) -> bool {
        self != DefectType::None
    }
}

impl Display for DefectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DefectType::None => write!(f, "none"),
            DefectType::Length => write!(f, "length"),
            DefectType::Conflict => write!(f, "conflict"),
        }
    }
}

/// An active fault condition. Renders verbatim via [`Display`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Alarm {
    /// Length scenario: the bar overshot `target + margin`.
    DimensionalTolerance,
    /// Conflict scenario: an unprotected remote write replaced the target.
    ControlConflict,
    /// Conflict scenario: priority arbitration silenced the remote write.
    OverrideBlocked,
    /// Conflict scenario: the forced target was reached and cut wrong.
    ConflictMiscut,
}

impl Alarm {
    /// The message surfaced to operators.
    pub const fn message(self) -> &'static str {
        match self {
            Alarm::DimensionalTolerance => "dimensional tolerance exceeded",
            Alarm::ControlConflict => "control conflict: external override of target setpoint",
            Alarm::OverrideBlocked => "override attempt blocked",
            Alarm::ConflictMiscut => "conflict-induced miscut",
        }
    }

    /// Informational alarms are observable but never stop the line.
    pub const fn is_blocking(self) -> bool {
        !matches!(self, Alarm::OverrideBlocked)
    }
}

impl Display for Alarm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}
