// One-shot end-of-playback latch, created fresh for every play cycle

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Why a play cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// The source ran out of frames
    Finished,
    /// The transport did not accept a frame in time; the player has halted
    Stalled,
    /// Pulling a frame failed mid-stream; the player has halted
    DecodeFailed(String),
    /// A new source was installed over a paused one
    Replaced,
    /// The player was closed
    Closed,
}

#[derive(Debug, Default)]
pub struct EndSignal {
    outcome: Mutex<Option<PlaybackOutcome>>,
    fired: Condvar,
}

impl EndSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome and wake every waiter. Only the first call wins;
    /// returns false if the signal had already fired.
    pub fn fire(&self, outcome: PlaybackOutcome) -> bool {
        let mut slot = self.outcome.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(outcome);
        self.fired.notify_all();
        true
    }

    pub fn outcome(&self) -> Option<PlaybackOutcome> {
        self.outcome.lock().clone()
    }

    /// Block until the signal fires
    pub fn wait(&self) -> PlaybackOutcome {
        let mut slot = self.outcome.lock();
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            self.fired.wait(&mut slot);
        }
    }

    /// Block until the signal fires or `timeout` elapses
    pub fn wait_timeout(&self, timeout: Duration) -> Option<PlaybackOutcome> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.outcome.lock();
        loop {
            if let Some(outcome) = slot.as_ref() {
                return Some(outcome.clone());
            }
            if self.fired.wait_until(&mut slot, deadline).timed_out() {
                return slot.clone();
            }
        }
    }
}
