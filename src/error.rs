//! Error types for voxframe
//!
//! One enum per failure point of a playback session, so callers can tell
//! a bad input apart from a broken transport.

use std::time::Duration;

use thiserror::Error;

/// The compressed input could not be opened as a frame source.
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("Failed to probe audio format: {0}")]
    Probe(String),

    #[error("No audio track found")]
    NoTrack,

    #[error("Failed to create decoder: {0}")]
    Decoder(String),

    #[error("Failed to create resampler: {0}")]
    Resampler(String),
}

/// A frame pull failed for a reason other than end of stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Failed to read packet: {0}")]
    Packet(String),

    #[error("Decode failed: {0}")]
    Decode(String),

    #[error("Resampling failed: {0}")]
    Resample(String),

    #[error("Frame encoding failed: {0}")]
    Encode(String),
}

/// Outcome of a frame push that did not complete.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The transport did not accept the frame before the deadline.
    #[error("Timed out after {0:?} sending frame to transport")]
    Timeout(Duration),

    #[error("Transport disconnected")]
    Disconnected,
}

/// Failure while releasing the underlying voice transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportCloseError {
    #[error("Transport already closed")]
    AlreadyClosed,

    #[error("Transport disconnect failed: {0}")]
    Disconnect(String),
}

/// Errors returned synchronously by `Player::play`.
#[derive(Error, Debug)]
pub enum PlayError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// A play cycle is already delivering frames.
    #[error("Player is busy with another source")]
    Busy,

    #[error("Player is closed")]
    Closed,

    /// The stream loop stopped after a stall or decode failure.
    #[error("Player stream loop has halted")]
    Halted,

    #[error("Failed to start stream loop: {0}")]
    Spawn(std::io::Error),
}

/// Settings file loading and validation errors
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid settings: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_error_wraps_encode_error() {
        let err: PlayError = EncodeError::NoTrack.into();
        assert!(matches!(err, PlayError::Encode(EncodeError::NoTrack)));
        assert_eq!(err.to_string(), "No audio track found");
    }

    #[test]
    fn test_sink_timeout_message() {
        let err = SinkError::Timeout(Duration::from_secs(1));
        assert_eq!(err.to_string(), "Timed out after 1s sending frame to transport");
    }
}
