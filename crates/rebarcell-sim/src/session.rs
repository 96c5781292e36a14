//! The session - imperative shell around the kernel.
//!
//! A `Session` is the single writer of the machine snapshot. Ticks and
//! commands both take `&mut self`, so they run to completion one at a time
//! and never interleave. Views read through [`Session::snapshot`] or
//! subscribe to the watch channel and the effect stream.

use rebarcell_config::RebarcellConfig;
use rebarcell_kernel::{
    Command, Effect, KernelError, MachineState, ProcessParams, apply_command, apply_tick,
};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::broadcast::{EffectBroadcast, TimedEffect};
use crate::event_log::{EventLog, Recording};

/// Result of submitting a command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// The command was applied. Empty effects means nothing changed.
    Applied(Vec<Effect>),
    /// The command was refused; the snapshot is untouched.
    Rejected(KernelError),
}

impl CommandOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// Converts into a `Result` for `?` propagation.
    pub fn into_result(self) -> Result<Vec<Effect>, KernelError> {
        match self {
            Self::Applied(effects) => Ok(effects),
            Self::Rejected(err) => Err(err),
        }
    }
}

/// Owns the machine snapshot and publishes it to views.
#[derive(Debug)]
pub struct Session {
    state: MachineState,
    params: ProcessParams,
    /// Ticks applied since the session was created.
    ticks: u64,
    state_tx: watch::Sender<MachineState>,
    effects: EffectBroadcast,
    recording: Option<EventLog>,
}

impl Session {
    /// Creates a session with the default effect buffer.
    pub fn new(initial: MachineState, params: ProcessParams) -> Self {
        Self::with_effect_buffer(initial, params, EffectBroadcast::default())
    }

    /// Creates a powered-on session from loaded configuration.
    pub fn from_config(config: &RebarcellConfig) -> Self {
        let initial = MachineState::with_environment(
            config.cell.control_authority,
            config.cell.priority_enabled,
            config.cell.supervisory_mode,
        );
        Self::with_effect_buffer(
            initial,
            config.process_params(),
            EffectBroadcast::new(config.scheduler.effect_buffer),
        )
    }

    fn with_effect_buffer(
        initial: MachineState,
        params: ProcessParams,
        effects: EffectBroadcast,
    ) -> Self {
        let (state_tx, _rx) = watch::channel(initial);
        Self {
            state: initial,
            params,
            ticks: 0,
            state_tx,
            effects,
            recording: None,
        }
    }

    // ========================================================================
    // Read Side
    // ========================================================================

    /// Returns a copy of the current snapshot.
    pub fn snapshot(&self) -> MachineState {
        self.state
    }

    pub fn params(&self) -> &ProcessParams {
        &self.params
    }

    /// Number of ticks applied so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// True if the thermal load is above the display threshold.
    pub fn is_overheated(&self) -> bool {
        self.state.is_overheated(self.params.overheat_threshold)
    }

    /// Subscribes to snapshots, refreshed after every tick and applied command.
    pub fn subscribe(&self) -> watch::Receiver<MachineState> {
        self.state_tx.subscribe()
    }

    /// Subscribes to kernel effects.
    pub fn subscribe_effects(&self) -> broadcast::Receiver<TimedEffect> {
        self.effects.subscribe()
    }

    // ========================================================================
    // Write Side
    // ========================================================================

    /// Advances the cell by one tick and publishes the result.
    pub fn tick(&mut self) -> Vec<Effect> {
        let (next, effects) = apply_tick(self.state, &self.params);
        self.ticks += 1;
        self.commit(next, &effects);
        effects
    }

    /// Validates and applies a discrete command.
    pub fn submit(&mut self, cmd: Command) -> CommandOutcome {
        let outcome = match apply_command(self.state, cmd) {
            Ok((next, effects)) => {
                debug!(
                    tick = self.ticks,
                    command = cmd.action.name(),
                    origin = %cmd.origin,
                    effects = effects.len(),
                    "command applied"
                );
                self.commit(next, &effects);
                CommandOutcome::Applied(effects)
            }
            Err(err) => {
                warn!(
                    tick = self.ticks,
                    command = cmd.action.name(),
                    origin = %cmd.origin,
                    error = %err,
                    "command rejected"
                );
                CommandOutcome::Rejected(err)
            }
        };

        if let Some(log) = self.recording.as_mut() {
            log.record(self.ticks, cmd, outcome.is_applied());
        }

        outcome
    }

    fn commit(&mut self, next: MachineState, effects: &[Effect]) {
        self.state = next;
        self.state_tx.send_replace(next);

        for &effect in effects {
            log_effect(self.ticks, effect);
            self.effects.send(TimedEffect {
                tick: self.ticks,
                effect,
            });
        }
    }

    // ========================================================================
    // Recording
    // ========================================================================

    /// Starts recording inputs from the current snapshot. Restarts any
    /// recording already in progress.
    pub fn start_recording(&mut self) {
        self.recording = Some(EventLog::begin(self.state, self.params, self.ticks));
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    /// Stops recording and seals it with the current snapshot.
    pub fn finish_recording(&mut self) -> Option<Recording> {
        self.recording
            .take()
            .map(|log| log.finish(self.ticks, &self.state))
    }
}

fn log_effect(tick: u64, effect: Effect) {
    match effect {
        Effect::AlarmRaised(alarm) => warn!(tick, %alarm, "alarm raised"),
        Effect::MotorInterlocked(alarm) => warn!(tick, %alarm, "motor interlocked"),
        Effect::TargetOverridden { from, to } => {
            warn!(tick, from, to, "target setpoint overridden");
        }
        Effect::EmergencyStopped => warn!(tick, "emergency stop"),
        Effect::CutCompleted { count, cut_length } => {
            debug!(tick, count, cut_length, "cut completed");
        }
        Effect::SimulationReset => info!(tick, "simulation reset"),
        other => debug!(tick, effect = ?other, "effect"),
    }
}

#[cfg(test)]
mod tests {
    use rebarcell_types::{Alarm, CommandOrigin, ControlAuthority, DefectType, SupervisoryMode};

    use super::*;

    const LOCAL: CommandOrigin = CommandOrigin::Local;

    fn running_session() -> Session {
        let mut session = Session::new(MachineState::new(), ProcessParams::default());
        assert!(session.submit(Command::start(LOCAL)).is_applied());
        session
    }

    #[test]
    fn submit_publishes_snapshot() {
        let mut session = Session::new(MachineState::new(), ProcessParams::default());
        let mut rx = session.subscribe();

        session.submit(Command::set_target_length(LOCAL, 6.0));

        assert!(rx.has_changed().expect("sender alive"));
        assert_eq!(rx.borrow_and_update().target_length(), 6.0);
        assert_eq!(session.snapshot().target_length(), 6.0);
    }

    #[test]
    fn tick_publishes_snapshot_and_counts() {
        let mut session = running_session();
        let rx = session.subscribe();

        session.tick();
        session.tick();

        assert_eq!(session.ticks(), 2);
        assert_eq!(*rx.borrow(), session.snapshot());
        assert!(session.snapshot().length() > 0.0);
    }

    #[test]
    fn rejection_leaves_snapshot_alone() {
        let mut session = Session::new(
            MachineState::with_environment(ControlAuthority::Local, false, SupervisoryMode::Manual),
            ProcessParams::default(),
        );
        let before = session.snapshot();

        let outcome = session.submit(Command::set_target_length(CommandOrigin::Remote, 4.0));

        assert!(outcome.is_rejected());
        assert!(matches!(
            outcome.into_result(),
            Err(KernelError::AuthorityDenied { .. })
        ));
        assert_eq!(session.snapshot(), before);
    }

    #[test]
    fn effects_are_broadcast_with_tick() {
        let mut session = running_session();
        let mut rx = session.subscribe_effects();

        session.submit(Command::select_defect(LOCAL, DefectType::Length));
        session.submit(Command::set_target_length(LOCAL, 0.5));
        for _ in 0..50 {
            session.tick();
        }

        let mut saw_alarm = false;
        while let Ok(timed) = rx.try_recv() {
            if timed.effect == Effect::AlarmRaised(Alarm::DimensionalTolerance) {
                assert!(timed.tick > 0);
                saw_alarm = true;
            }
        }
        assert!(saw_alarm);
    }

    #[test]
    fn from_config_applies_cell_environment() {
        let mut config = RebarcellConfig::default();
        config.cell.control_authority = ControlAuthority::Remote;
        config.cell.supervisory_mode = SupervisoryMode::Scada;
        config.process.feed_rate = 0.5;

        let mut session = Session::from_config(&config);
        session.submit(Command::start(CommandOrigin::Remote));
        session.tick();

        assert_eq!(session.snapshot().control_authority(), ControlAuthority::Remote);
        assert_eq!(session.snapshot().supervisory_mode(), SupervisoryMode::Scada);
        assert_eq!(session.snapshot().length(), 0.5);
    }

    #[test]
    fn overheat_indicator_follows_threshold() {
        let mut params = ProcessParams::default();
        params.overheat_threshold = 25.005;
        let mut session = Session::new(MachineState::new(), params);
        assert!(!session.is_overheated());

        session.submit(Command::start(LOCAL));
        session.tick();

        assert!(session.is_overheated());
    }
}
