//! Shared test doubles for player tests
//!
//! Scripted frame sources and recording/stalling sinks, plus an in-memory
//! WAV generator for exercising the real decode path.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use hound::{SampleFormat, WavSpec, WavWriter};
use parking_lot::Mutex;
use voxframe::error::{DecodeError, SinkError, TransportCloseError};
use voxframe::{Frame, FrameSink, FrameSource, PlaybackSettings};

/// One scripted pull result
pub enum Step {
    Frame(Frame),
    Fail(String),
}

/// Frame source that replays a fixed script, then reports end of stream
pub struct ScriptedSource {
    steps: VecDeque<Step>,
    cleanups: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>) -> (Box<dyn FrameSource>, Arc<AtomicUsize>) {
        let cleanups = Arc::new(AtomicUsize::new(0));
        let source = Self {
            steps: steps.into(),
            cleanups: Arc::clone(&cleanups),
        };
        (Box::new(source), cleanups)
    }

    /// Source producing frames `[1], [2], ... [count]`
    pub fn frames(count: u8) -> (Box<dyn FrameSource>, Arc<AtomicUsize>) {
        Self::new((1..=count).map(|n| Step::Frame(frame(n))).collect())
    }
}

impl FrameSource for ScriptedSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, DecodeError> {
        match self.steps.pop_front() {
            Some(Step::Frame(frame)) => Ok(Some(frame)),
            Some(Step::Fail(msg)) => Err(DecodeError::Decode(msg)),
            None => Ok(None),
        }
    }

    fn cleanup(&mut self) {
        self.steps.clear();
        self.cleanups.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn frame(n: u8) -> Frame {
    Frame::new(vec![n])
}

/// Sink that records delivered frames. Can be slowed down or made to
/// stall every send until its deadline.
#[derive(Default)]
pub struct RecordingSink {
    frames: Mutex<Vec<Frame>>,
    attempts: AtomicUsize,
    disconnects: AtomicUsize,
    delay: Mutex<Duration>,
    stalled: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        let sink = Self::default();
        *sink.delay.lock() = delay;
        Arc::new(sink)
    }

    pub fn stalled() -> Arc<Self> {
        let sink = Self::default();
        sink.stalled.store(true, Ordering::SeqCst);
        Arc::new(sink)
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.frames.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

impl FrameSink for RecordingSink {
    fn send(&self, frame: Frame, timeout: Duration) -> Result<(), SinkError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if self.stalled.load(Ordering::SeqCst) {
            thread::sleep(timeout);
            return Err(SinkError::Timeout(timeout));
        }

        let delay = *self.delay.lock();
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        self.frames.lock().push(frame);
        Ok(())
    }

    fn disconnect(&self) -> Result<(), TransportCloseError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Settings with a short send deadline so stall tests run quickly
pub fn fast_settings() -> PlaybackSettings {
    PlaybackSettings {
        send_timeout_ms: 100,
        ..Default::default()
    }
}

/// 16-bit PCM WAV held in memory
pub fn wav_bytes(sample_rate: u32, channels: u16, frames: usize) -> Vec<u8> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).expect("wav writer");
        for i in 0..frames * channels as usize {
            let t = i as f32 / sample_rate as f32;
            let sample = (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5;
            writer
                .write_sample((sample * i16::MAX as f32) as i16)
                .expect("write sample");
        }
        writer.finalize().expect("finalize wav");
    }
    cursor.into_inner()
}
