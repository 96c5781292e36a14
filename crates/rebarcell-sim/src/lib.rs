//! # rebarcell-sim: the imperative shell
//!
//! Owns the machine snapshot, drives the kernel on a fixed tick and
//! publishes the result to views.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    Imperative Shell                       │
//! │  ┌───────────────┐   ┌──────────────┐   ┌─────────────┐   │
//! │  │ TickScheduler │   │ Session      │   │ EventLog    │   │
//! │  │ Realtime...   │──>│ (one writer) │──>│ (recording) │   │
//! │  └───────────────┘   └──────┬───────┘   └─────────────┘   │
//! │                             │ watch + broadcast            │
//! │                             v                              │
//! │                           views                            │
//! └─────────────────────────────┬────────────────────────────┘
//!                               │ apply_tick / apply_command
//! ┌─────────────────────────────v────────────────────────────┐
//! │              Functional Core (rebarcell-kernel)           │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use std::time::Duration;
//!
//! use rebarcell_kernel::{Command, MachineState, ProcessParams};
//! use rebarcell_sim::{Session, TickScheduler};
//! use rebarcell_types::CommandOrigin;
//!
//! let mut session = Session::new(MachineState::new(), ProcessParams::default());
//! let mut scheduler = TickScheduler::new(Duration::from_millis(50))?;
//!
//! session.submit(Command::set_auto(CommandOrigin::Local, true));
//! session.submit(Command::start(CommandOrigin::Local));
//! scheduler.advance(&mut session, 200);
//!
//! assert_eq!(session.snapshot().count(), 1);
//! # Ok::<(), rebarcell_sim::SimError>(())
//! ```
//!
//! ## Key Concepts
//!
//! - **`Session`**: single writer; `tick` and `submit` never interleave
//! - **`TickScheduler`**: discrete simulated time, `advance(n)` fires n ticks
//! - **`RealtimeScheduler`**: tokio interval, stopped by a `CancelHandle`
//! - **`Recording`**: inputs of a run, replayed and verified by state hash
//! - **`Workload`**: seeded random commands checked against invariants

mod broadcast;
mod clock;
mod error;
pub mod event_log;
pub mod invariant;
mod scheduler;
mod session;
pub mod workload;

pub use broadcast::{EffectBroadcast, TimedEffect};
pub use clock::{SimClock, ms_to_ns, ns_to_ms};
pub use error::SimError;
pub use event_log::{EventLog, LoggedCommand, Recording};
pub use invariant::{InvariantResult, StateInvariantChecker};
pub use scheduler::{CancelHandle, RealtimeScheduler, SharedSession, TickScheduler};
pub use session::{CommandOutcome, Session};
pub use workload::{Workload, WorkloadConfig, WorkloadStep, WorkloadSummary};
