//! Discrete simulated time.
//!
//! The deterministic driver never reads the wall clock. Time only moves when
//! the scheduler fires a tick, one period at a time.

/// Nanoseconds per millisecond.
pub const NS_PER_MS: u64 = 1_000_000;

/// Converts milliseconds to nanoseconds.
#[inline]
pub const fn ms_to_ns(ms: u64) -> u64 {
    ms * NS_PER_MS
}

/// Converts nanoseconds to milliseconds (truncating).
#[inline]
pub const fn ns_to_ms(ns: u64) -> u64 {
    ns / NS_PER_MS
}

/// Deterministic clock with nanosecond precision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimClock {
    now_ns: u64,
}

impl SimClock {
    /// Creates a new clock starting at time zero.
    pub fn new() -> Self {
        Self { now_ns: 0 }
    }

    /// Creates a clock starting at the specified time.
    pub fn at(now_ns: u64) -> Self {
        Self { now_ns }
    }

    /// Current simulated time in nanoseconds.
    #[inline]
    pub fn now(&self) -> u64 {
        self.now_ns
    }

    /// Current simulated time in milliseconds.
    #[inline]
    pub fn now_ms(&self) -> u64 {
        ns_to_ms(self.now_ns)
    }

    /// Advances the clock by `delta_ns`, saturating at `u64::MAX`.
    pub fn advance_by(&mut self, delta_ns: u64) {
        self.now_ns = self.now_ns.saturating_add(delta_ns);
    }

    /// Advances time to the given value.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `time_ns` is in the past.
    pub fn advance_to(&mut self, time_ns: u64) {
        debug_assert!(
            time_ns >= self.now_ns,
            "time cannot go backwards: current={}, target={}",
            self.now_ns,
            time_ns
        );
        self.now_ns = time_ns;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_only_on_request() {
        let mut clock = SimClock::new();
        assert_eq!(clock.now(), 0);

        clock.advance_by(ms_to_ns(50));
        assert_eq!(clock.now_ms(), 50);

        clock.advance_to(ms_to_ns(120));
        assert_eq!(clock.now(), 120_000_000);
    }

    #[test]
    fn advance_saturates() {
        let mut clock = SimClock::at(u64::MAX - 1);
        clock.advance_by(10);
        assert_eq!(clock.now(), u64::MAX);
    }

    #[test]
    #[should_panic(expected = "time cannot go backwards")]
    #[cfg(debug_assertions)]
    fn backwards_time_panics() {
        let mut clock = SimClock::at(100);
        clock.advance_to(50);
    }
}
