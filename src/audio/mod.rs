// Audio playback module
// Uses Symphonia for decoding, rubato for rate conversion and a ring
// buffer between the stream loop and the voice transport

pub mod decoder;
pub mod frame;
pub mod player;
pub mod resampler;
pub mod signal;
pub mod sink;
pub mod source;
mod stream_loop;

// Re-exports for convenience
pub use frame::{Frame, FrameFormat};
pub use player::{Player, PlayerState, StatsSnapshot};
pub use signal::{EndSignal, PlaybackOutcome};
pub use sink::{ring_buffer_sink, FrameReceiver, FrameSink, RingBufferSink};
pub use source::{
    EncodedFrameSource, EncoderOpener, FrameEncoder, FrameSource, PcmEncoder, SourceOpener,
};
