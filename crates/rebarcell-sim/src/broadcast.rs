//! Effect broadcasting for views that keep their own history.

use rebarcell_kernel::Effect;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// A kernel effect stamped with the tick it happened on.
///
/// Commands applied between ticks carry the number of the last completed tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimedEffect {
    pub tick: u64,
    pub effect: Effect,
}

/// Broadcasts effects to connected views.
#[derive(Debug, Clone)]
pub struct EffectBroadcast {
    tx: broadcast::Sender<TimedEffect>,
}

impl EffectBroadcast {
    /// Creates a new broadcaster with the given buffer size.
    ///
    /// # Arguments
    /// * `buffer_size` - Number of effects to buffer for slow consumers
    pub fn new(buffer_size: usize) -> Self {
        let (tx, _rx) = broadcast::channel(buffer_size.max(1));
        Self { tx }
    }

    /// Sends an effect to all subscribers.
    ///
    /// Returns the number of active subscribers who received it. Having no
    /// subscribers is not an error. Slow subscribers who fall behind receive
    /// `RecvError::Lagged`.
    pub fn send(&self, effect: TimedEffect) -> usize {
        self.tx.send(effect).unwrap_or_default()
    }

    /// Subscribes to effects. Effects sent before subscription are not included.
    pub fn subscribe(&self) -> broadcast::Receiver<TimedEffect> {
        self.tx.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EffectBroadcast {
    fn default() -> Self {
        Self::new(256)
    }
}
