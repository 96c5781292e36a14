//! Tick scheduling.
//!
//! Two drivers share one rule: every period fires exactly one tick, none
//! are skipped and none are merged.
//!
//! - [`TickScheduler`] advances a [`SimClock`] under caller control. Tests
//!   and replays use it; it never touches the wall clock.
//! - [`RealtimeScheduler`] fires ticks on a tokio interval until cancelled.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rebarcell_config::SchedulerConfig;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::broadcast::TimedEffect;
use crate::clock::SimClock;
use crate::session::Session;
use crate::SimError;

/// A session shared between the real-time driver and command sources.
pub type SharedSession = Arc<Mutex<Session>>;

// ============================================================================
// Deterministic Driver
// ============================================================================

/// Fires ticks on simulated time.
#[derive(Debug, Clone)]
pub struct TickScheduler {
    period_ns: u64,
    clock: SimClock,
}

impl TickScheduler {
    /// Creates a scheduler with the given tick period.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidTickPeriod`] for a zero period.
    pub fn new(period: Duration) -> Result<Self, SimError> {
        let period = check_period(period)?;
        Ok(Self {
            period_ns: u64::try_from(period.as_nanos()).unwrap_or(u64::MAX),
            clock: SimClock::new(),
        })
    }

    pub fn from_config(config: &SchedulerConfig) -> Result<Self, SimError> {
        Self::new(config.tick_period())
    }

    pub fn period(&self) -> Duration {
        Duration::from_nanos(self.period_ns)
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Fires exactly `ticks` ticks, advancing the clock one period per tick.
    ///
    /// Returns every effect produced, stamped with its tick number.
    pub fn advance(&mut self, session: &mut Session, ticks: u64) -> Vec<TimedEffect> {
        let mut fired = Vec::new();

        for _ in 0..ticks {
            self.clock.advance_by(self.period_ns);
            let effects = session.tick();
            let tick = session.ticks();
            fired.extend(effects.into_iter().map(|effect| TimedEffect { tick, effect }));
        }

        fired
    }

    /// Fires every tick that falls due within `duration` of simulated time.
    ///
    /// Returns the number of ticks fired. A trailing partial period carries
    /// over to the next call.
    pub fn run_for(&mut self, session: &mut Session, duration: Duration) -> u64 {
        let target = self
            .clock
            .now()
            .saturating_add(u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX));
        let mut fired = 0;

        // Ticks fall on multiples of the period.
        let mut due = (self.clock.now() / self.period_ns + 1).saturating_mul(self.period_ns);
        while due <= target {
            self.clock.advance_to(due);
            session.tick();
            fired += 1;
            match due.checked_add(self.period_ns) {
                Some(next) => due = next,
                None => break,
            }
        }

        self.clock.advance_to(target);
        fired
    }
}

fn check_period(period: Duration) -> Result<Duration, SimError> {
    if period.is_zero() {
        return Err(SimError::InvalidTickPeriod(period));
    }
    Ok(period)
}

// ============================================================================
// Real-Time Driver
// ============================================================================

/// Stops a running [`RealtimeScheduler`].
///
/// Cancellation takes the session lock, so once [`CancelHandle::cancel`]
/// returns no further tick is applied.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    stop: Arc<watch::Sender<bool>>,
    session: SharedSession,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _guard = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        self.stop.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.stop.borrow()
    }
}

/// Fires ticks on wall-clock time.
#[derive(Debug)]
pub struct RealtimeScheduler {
    session: SharedSession,
    period: Duration,
    stop: Arc<watch::Sender<bool>>,
}

impl RealtimeScheduler {
    /// # Errors
    ///
    /// Returns [`SimError::InvalidTickPeriod`] for a zero period.
    pub fn new(session: SharedSession, period: Duration) -> Result<Self, SimError> {
        let period = check_period(period)?;
        let (stop, _rx) = watch::channel(false);
        Ok(Self {
            session,
            period,
            stop: Arc::new(stop),
        })
    }

    pub fn from_config(
        session: SharedSession,
        config: &SchedulerConfig,
    ) -> Result<Self, SimError> {
        Self::new(session, config.tick_period())
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            stop: Arc::clone(&self.stop),
            session: Arc::clone(&self.session),
        }
    }

    /// Runs until cancelled. Returns the number of ticks fired.
    ///
    /// The first tick fires one period after start. Ticks that fall behind
    /// (a slow view holding the session, a stalled runtime) are fired back
    /// to back on recovery rather than dropped.
    pub async fn run(self) -> Result<u64, SimError> {
        let mut stop = self.stop.subscribe();
        let mut interval = time::interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Burst);

        info!(
            period_ms = self.period.as_millis() as u64,
            "tick scheduler started"
        );
        let mut fired = 0u64;

        loop {
            if *stop.borrow_and_update() {
                break;
            }

            tokio::select! {
                biased;

                _ = stop.changed() => {}

                _ = interval.tick() => {
                    let mut session = self.session.lock().map_err(|_| SimError::SessionPoisoned)?;
                    // Checked under the lock: cancel() may have won the race.
                    if *stop.borrow() {
                        break;
                    }
                    session.tick();
                    fired += 1;
                    debug!(tick = session.ticks(), "tick fired");
                }
            }
        }

        info!(fired, "tick scheduler stopped");
        Ok(fired)
    }
}
