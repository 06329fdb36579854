// Frame sinks: the transport side of the player
// A bounded ring buffer models the transport's outgoing send buffer

use parking_lot::Mutex;
use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    HeapRb,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::frame::Frame;
use crate::error::{SinkError, TransportCloseError};

/// How long a blocked `send` waits before retrying the push
const SEND_BACKOFF: Duration = Duration::from_millis(1);

type RingProducer = ringbuf::HeapProd<Frame>;
type RingConsumer = ringbuf::HeapCons<Frame>;

/// Accepts one encoded frame per call. `send` may block while the
/// transport's buffer is full, but never past `timeout`.
pub trait FrameSink: Send + Sync {
    fn send(&self, frame: Frame, timeout: Duration) -> Result<(), SinkError>;

    /// Tear down the underlying transport.
    fn disconnect(&self) -> Result<(), TransportCloseError>;
}

/// Create a connected sink/receiver pair holding at most `capacity` frames
pub fn ring_buffer_sink(capacity: usize) -> (RingBufferSink, FrameReceiver) {
    let rb = HeapRb::<Frame>::new(capacity.max(1));
    let (producer, consumer) = rb.split();
    let disconnected = Arc::new(AtomicBool::new(false));

    (
        RingBufferSink {
            producer: Mutex::new(producer),
            disconnected: disconnected.clone(),
        },
        FrameReceiver {
            consumer: Mutex::new(consumer),
            disconnected,
        },
    )
}

pub struct RingBufferSink {
    producer: Mutex<RingProducer>,
    disconnected: Arc<AtomicBool>,
}

impl RingBufferSink {
    /// Frames queued and not yet taken by the transport
    pub fn queued(&self) -> usize {
        self.producer.lock().occupied_len()
    }
}

impl FrameSink for RingBufferSink {
    fn send(&self, frame: Frame, timeout: Duration) -> Result<(), SinkError> {
        let deadline = Instant::now() + timeout;
        let mut frame = frame;

        loop {
            if self.disconnected.load(Ordering::SeqCst) {
                return Err(SinkError::Disconnected);
            }

            match self.producer.lock().try_push(frame) {
                Ok(()) => return Ok(()),
                Err(rejected) => frame = rejected,
            }

            // Buffer full, wait for the transport to drain it
            if Instant::now() >= deadline {
                return Err(SinkError::Timeout(timeout));
            }
            thread::sleep(SEND_BACKOFF);
        }
    }

    fn disconnect(&self) -> Result<(), TransportCloseError> {
        if self.disconnected.swap(true, Ordering::SeqCst) {
            return Err(TransportCloseError::AlreadyClosed);
        }
        info!(dropped = self.queued(), "Transport disconnected");
        Ok(())
    }
}

/// Transport end of a ring buffer sink. Dropping it disconnects the sink.
pub struct FrameReceiver {
    consumer: Mutex<RingConsumer>,
    disconnected: Arc<AtomicBool>,
}

impl FrameReceiver {
    pub fn try_recv(&self) -> Option<Frame> {
        self.consumer.lock().try_pop()
    }

    /// Wait up to `timeout` for a frame
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Frame> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(frame) = self.try_recv() {
                return Some(frame);
            }
            if Instant::now() >= deadline {
                return None;
            }
            thread::sleep(SEND_BACKOFF);
        }
    }

    pub fn len(&self) -> usize {
        self.consumer.lock().occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }
}

impl Drop for FrameReceiver {
    fn drop(&mut self) {
        if !self.disconnected.swap(true, Ordering::SeqCst) {
            debug!("Frame receiver dropped, sink disconnected");
        }
    }
}
