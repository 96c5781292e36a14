//! Seeded random workloads.
//!
//! A workload interleaves ticks with random operator and remote commands.
//! The same seed always produces the same sequence, so a failing run can be
//! reproduced from its seed alone.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rebarcell_kernel::{Action, Command, Effect};
use rebarcell_types::{CommandOrigin, ControlAuthority, DefectType, SupervisoryMode};
use tracing::{debug, info};

use crate::SimError;
use crate::invariant::StateInvariantChecker;
use crate::session::Session;

// ============================================================================
// Workload Configuration
// ============================================================================

/// Configuration for a random workload.
#[derive(Debug, Clone)]
pub struct WorkloadConfig {
    /// Seed for the command generator.
    pub seed: u64,

    /// Number of steps (ticks plus commands) to generate.
    pub steps: usize,

    /// Probability that a step is a command rather than a tick.
    pub command_probability: f64,

    /// Probability that a command comes from the remote controller.
    pub remote_probability: f64,
}

impl WorkloadConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            steps: 2_000,
            command_probability: 0.05,
            remote_probability: 0.5,
        }
    }
}

/// One generated step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorkloadStep {
    Tick,
    Command(Command),
}

// Includes setpoints the kernel must reject.
const TARGET_LENGTHS: [f64; 7] = [-1.0, 0.0, 2.5, 3.0, 5.0, 8.0, 12.0];

const DEFECTS: [DefectType; 3] = [DefectType::None, DefectType::Length, DefectType::Conflict];

const AUTHORITIES: [ControlAuthority; 3] = [
    ControlAuthority::Local,
    ControlAuthority::Remote,
    ControlAuthority::Shared,
];

// ============================================================================
// Workload Generator
// ============================================================================

/// Deterministic generator of workload steps.
#[derive(Debug, Clone)]
pub struct Workload {
    rng: SmallRng,
    config: WorkloadConfig,
}

impl Workload {
    pub fn new(config: WorkloadConfig) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(config.seed),
            config,
        }
    }

    pub fn config(&self) -> &WorkloadConfig {
        &self.config
    }

    /// Generates the next step.
    pub fn next_step(&mut self) -> WorkloadStep {
        if self.rng.gen_bool(self.config.command_probability) {
            WorkloadStep::Command(self.next_command())
        } else {
            WorkloadStep::Tick
        }
    }

    /// Generates the full configured sequence.
    pub fn generate(&mut self) -> Vec<WorkloadStep> {
        (0..self.config.steps).map(|_| self.next_step()).collect()
    }

    fn next_command(&mut self) -> Command {
        let origin = if self.rng.gen_bool(self.config.remote_probability) {
            CommandOrigin::Remote
        } else {
            CommandOrigin::Local
        };
        Command::new(origin, self.next_action())
    }

    fn next_action(&mut self) -> Action {
        match self.rng.gen_range(0..11) {
            0 => Action::SetRunning(self.rng.gen_bool(0.7)),
            1 => Action::SetAuto(self.rng.gen_bool(0.7)),
            2 => Action::SetTargetLength(pick(&mut self.rng, &TARGET_LENGTHS)),
            3 => Action::ResetCount,
            4 => Action::ManualCut,
            5 => Action::EmergencyStop,
            6 => Action::SelectDefectScenario(pick(&mut self.rng, &DEFECTS)),
            7 => Action::SetControlAuthority(pick(&mut self.rng, &AUTHORITIES)),
            8 => Action::SetPriorityEnabled(self.rng.gen_bool(0.5)),
            9 => Action::SetSupervisoryMode(pick(&mut self.rng, &SupervisoryMode::ALL)),
            _ => Action::ResetSimulation,
        }
    }

    /// Drives `session` through the configured steps, checking invariants
    /// after every step.
    ///
    /// Stops at the first violation.
    pub fn run_checked(
        &mut self,
        session: &mut Session,
        checker: &mut StateInvariantChecker,
    ) -> Result<WorkloadSummary, SimError> {
        info!(seed = self.config.seed, steps = self.config.steps, "workload started");
        let mut summary = WorkloadSummary {
            seed: self.config.seed,
            ..WorkloadSummary::default()
        };

        for _ in 0..self.config.steps {
            let before = session.snapshot();

            match self.next_step() {
                WorkloadStep::Tick => {
                    let effects = session.tick();
                    summary.ticks += 1;
                    summary.record_effects(&effects);

                    let after = session.snapshot();
                    if let Some(err) = checker
                        .check_tick(&before, &after, &effects)
                        .into_error(session.ticks())
                    {
                        return Err(err);
                    }
                }
                WorkloadStep::Command(cmd) => {
                    let outcome = session.submit(cmd);
                    if outcome.is_applied() {
                        summary.commands_applied += 1;
                    } else {
                        summary.commands_rejected += 1;
                    }

                    let after = session.snapshot();
                    if let Some(err) = checker
                        .check_command(&before, &cmd, &outcome, &after)
                        .into_error(session.ticks())
                    {
                        return Err(err);
                    }
                }
            }
        }

        debug!(?summary, "workload finished");
        Ok(summary)
    }
}

fn pick<T: Copy>(rng: &mut SmallRng, options: &[T]) -> T {
    options[rng.gen_range(0..options.len())]
}

// ============================================================================
// Summary
// ============================================================================

/// Counters from a checked workload run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkloadSummary {
    pub seed: u64,
    pub ticks: u64,
    pub commands_applied: u64,
    pub commands_rejected: u64,
    pub cuts: u64,
    pub alarms_raised: u64,
}

impl WorkloadSummary {
    fn record_effects(&mut self, effects: &[Effect]) {
        for effect in effects {
            match effect {
                Effect::CutCompleted { .. } => self.cuts += 1,
                Effect::AlarmRaised(_) => self.alarms_raised += 1,
                _ => {}
            }
        }
    }
}
