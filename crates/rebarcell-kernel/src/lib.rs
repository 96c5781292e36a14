//! # rebarcell-kernel: Functional core of the rebar-cutting cell
//!
//! The kernel is the pure, deterministic heart of the simulator. It receives
//! ticks and discrete commands and produces a new machine state plus the
//! effects that describe what happened.
//!
//! ## Key Principles
//!
//! - **No IO**: The kernel never logs, sleeps, or touches a channel
//! - **No clocks**: Tick cadence is owned by the scheduler in `rebarcell-sim`
//! - **No randomness**: Same input always produces same output, including
//!   the dual-controller race, which is executed deterministically
//! - **Pure functions**: `apply_tick(state, params) -> (state, effects)` and
//!   `apply_command(state, cmd) -> Result<(state, effects), KernelError>`
//!
//! ## Architecture
//!
//! - [`state`]: The `MachineState` snapshot
//! - [`command`]: Origin-tagged commands (`SetTargetLength`, `SelectDefectScenario`, ...)
//! - [`effects`]: Effects for the shell to publish (`CutCompleted`, `AlarmRaised`, ...)
//! - [`params`]: Physical increments and fault thresholds
//! - [`authority`]: The arbiter deciding which controller may write setpoints
//! - [`defect`]: Fault-scenario evaluation inside a tick
//! - [`tick`]: The transition function
//! - [`kernel`]: The `apply_command` function that ties commands together
//!
//! ## Example
//!
//! ```
//! use rebarcell_kernel::{Command, MachineState, ProcessParams, apply_command, apply_tick};
//! use rebarcell_types::CommandOrigin;
//!
//! let params = ProcessParams::default();
//! let state = MachineState::new();
//!
//! let (state, _) = apply_command(state, Command::start(CommandOrigin::Local)).unwrap();
//! let (state, _effects) = apply_tick(state, &params);
//!
//! assert!(state.length() > 0.0);
//! ```

pub mod authority;
pub mod command;
mod defect;
pub mod effects;
pub mod kernel;
pub mod params;
pub mod state;
pub mod state_hash;
pub mod tick;


pub use authority::authorize;
pub use command::{Action, Command};
pub use effects::Effect;
pub use kernel::{KernelError, apply_command};
pub use params::ProcessParams;
pub use state::MachineState;
pub use tick::apply_tick;
