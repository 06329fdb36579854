// Frame player: owns one frame source at a time and the stream loop
// thread that pushes its frames into the transport sink
use parking_lot::{Condvar, Mutex};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info};

use super::signal::{EndSignal, PlaybackOutcome};
use super::sink::FrameSink;
use super::source::{FrameSource, SourceOpener};
use super::stream_loop;
use crate::error::{PlayError, TransportCloseError};
use crate::settings::PlaybackSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Playing,
    Paused,
    /// Stream loop stopped after a stall or decode failure
    Halted,
    Closed,
}

/// Counters updated by the stream loop
#[derive(Debug, Default)]
pub struct PlayerStats {
    frames_sent: AtomicU64,
    cycles_finished: AtomicU64,
    stalls: AtomicU64,
    decode_failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub frames_sent: u64,
    pub cycles_finished: u64,
    pub stalls: u64,
    pub decode_failures: u64,
}

impl PlayerStats {
    pub(crate) fn record_frame(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_finished(&self) {
        self.cycles_finished.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_stall(&self) {
        self.stalls.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            cycles_finished: self.cycles_finished.load(Ordering::Relaxed),
            stalls: self.stalls.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
        }
    }
}

/// Everything the lock guards
pub(crate) struct Inner {
    pub(crate) state: PlayerState,
    pub(crate) source: Option<Box<dyn FrameSource>>,
    pub(crate) end: Option<Arc<EndSignal>>,
    /// Incremented on every successful play
    pub(crate) cycle: u64,
}

impl Inner {
    /// Release the active source and fire the current end signal, if armed
    pub(crate) fn finish_cycle(&mut self, outcome: PlaybackOutcome) {
        if let Some(mut source) = self.source.take() {
            source.cleanup();
        }
        if let Some(end) = self.end.as_ref() {
            if end.fire(outcome.clone()) {
                debug!(cycle = self.cycle, ?outcome, "Play cycle ended");
            }
        }
    }
}

pub(crate) struct Shared {
    pub(crate) inner: Mutex<Inner>,
    /// Notified on every state transition
    pub(crate) wake: Condvar,
    pub(crate) sink: Arc<dyn FrameSink>,
    pub(crate) stats: PlayerStats,
    pub(crate) settings: PlaybackSettings,
}

pub struct Player {
    shared: Arc<Shared>,
    opener: Box<dyn SourceOpener>,
    worker: Option<JoinHandle<()>>,
}

impl Player {
    /// Create a player bound to `sink` and start its stream loop thread
    pub fn new(
        sink: Arc<dyn FrameSink>,
        opener: impl SourceOpener + 'static,
        settings: PlaybackSettings,
    ) -> io::Result<Self> {
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                state: PlayerState::Idle,
                source: None,
                end: None,
                cycle: 0,
            }),
            wake: Condvar::new(),
            sink,
            stats: PlayerStats::default(),
            settings,
        });

        let loop_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("voxframe-stream".to_string())
            .spawn(move || stream_loop::run(loop_shared))?;

        Ok(Self {
            shared,
            opener: Box::new(opener),
            worker: Some(worker),
        })
    }

    /// Create a player and immediately start playing `audio`
    pub fn start(
        sink: Arc<dyn FrameSink>,
        opener: impl SourceOpener + 'static,
        settings: PlaybackSettings,
        audio: Vec<u8>,
    ) -> Result<Self, PlayError> {
        let player = Self::new(sink, opener, settings).map_err(PlayError::Spawn)?;
        player.play(audio)?;
        Ok(player)
    }

    /// Decode `audio` into a new frame source and start playing it.
    /// Fails without touching player state if the input cannot be opened.
    pub fn play(&self, audio: Vec<u8>) -> Result<(), PlayError> {
        // Don't spend time decoding for a player that can't accept it
        Self::check_accepts(self.shared.inner.lock().state)?;

        let source = self
            .opener
            .open(audio, self.shared.settings.frame_format())?;
        self.play_source(source)
    }

    /// Start playing an already constructed source
    pub fn play_source(&self, mut source: Box<dyn FrameSource>) -> Result<(), PlayError> {
        let mut inner = self.shared.inner.lock();
        if let Err(e) = Self::check_accepts(inner.state) {
            drop(inner);
            source.cleanup();
            return Err(e);
        }

        if inner.state == PlayerState::Paused {
            info!(cycle = inner.cycle, "Replacing paused source");
            inner.finish_cycle(PlaybackOutcome::Replaced);
        }

        inner.cycle += 1;
        inner.source = Some(source);
        inner.end = Some(Arc::new(EndSignal::new()));
        inner.state = PlayerState::Playing;
        info!(cycle = inner.cycle, "Playback started");
        drop(inner);

        self.shared.wake.notify_all();
        Ok(())
    }

    fn check_accepts(state: PlayerState) -> Result<(), PlayError> {
        match state {
            PlayerState::Idle | PlayerState::Paused => Ok(()),
            PlayerState::Playing => Err(PlayError::Busy),
            PlayerState::Halted => Err(PlayError::Halted),
            PlayerState::Closed => Err(PlayError::Closed),
        }
    }

    /// Suspend frame delivery. No-op unless playing.
    pub fn pause(&self) {
        let mut inner = self.shared.inner.lock();
        if inner.state == PlayerState::Playing {
            inner.state = PlayerState::Paused;
            info!(cycle = inner.cycle, "Playback paused");
        }
    }

    /// Continue a paused source. No-op unless paused.
    pub fn resume(&self) {
        let mut inner = self.shared.inner.lock();
        if inner.state != PlayerState::Paused {
            return;
        }
        inner.state = PlayerState::Playing;
        info!(cycle = inner.cycle, "Playback resumed");
        drop(inner);
        self.shared.wake.notify_all();
    }

    fn current_end(&self) -> Option<Arc<EndSignal>> {
        self.shared.inner.lock().end.clone()
    }

    /// Block until the current play cycle ends. Returns None if nothing
    /// has ever been played.
    pub fn wait_for_end(&self) -> Option<PlaybackOutcome> {
        self.current_end().map(|end| end.wait())
    }

    /// Like `wait_for_end`, giving up after `timeout`
    pub fn wait_for_end_timeout(&self, timeout: Duration) -> Option<PlaybackOutcome> {
        self.current_end()?.wait_timeout(timeout)
    }

    /// Wait for the current play cycle on the blocking pool
    pub async fn wait_for_end_async(&self) -> Option<PlaybackOutcome> {
        let end = self.current_end()?;
        match tokio::task::spawn_blocking(move || end.wait()).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!(error = %e, "End signal wait task failed");
                None
            }
        }
    }

    /// Stop playback for good and disconnect the transport. Calling it
    /// again is a no-op.
    pub fn close(&self) -> Result<(), TransportCloseError> {
        {
            let mut inner = self.shared.inner.lock();
            if inner.state == PlayerState::Closed {
                debug!("Player already closed");
                return Ok(());
            }
            inner.state = PlayerState::Closed;
            inner.finish_cycle(PlaybackOutcome::Closed);
        }
        self.shared.wake.notify_all();

        info!("Player closed, disconnecting transport");
        self.shared.sink.disconnect()
    }

    pub fn state(&self) -> PlayerState {
        self.shared.inner.lock().state
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    pub fn settings(&self) -> &PlaybackSettings {
        &self.shared.settings
    }
}

impl Drop for Player {
    // Stops the loop but leaves the transport connected; use close() to
    // release it.
    fn drop(&mut self) {
        {
            let mut inner = self.shared.inner.lock();
            if inner.state != PlayerState::Closed {
                inner.state = PlayerState::Closed;
                inner.finish_cycle(PlaybackOutcome::Closed);
            }
        }
        self.shared.wake.notify_all();

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Stream loop thread panicked");
            }
        }
    }
}
