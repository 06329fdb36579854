// voxframe - streams compressed audio into a real-time voice transport
// Module declarations
pub mod audio;
pub mod error;
pub mod settings;

pub use audio::{
    ring_buffer_sink, EncoderOpener, Frame, FrameFormat, FrameReceiver, FrameSink, FrameSource,
    PlaybackOutcome, Player, PlayerState, RingBufferSink, SourceOpener,
};
pub use error::{DecodeError, EncodeError, PlayError, SinkError, TransportCloseError};
pub use settings::PlaybackSettings;
