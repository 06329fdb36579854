// Encoded frames and the fixed PCM layout they are cut from

use std::time::Duration;

/// PCM layout every frame is produced in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub frame_duration_ms: u32,
}

impl FrameFormat {
    /// Stereo 48 kHz in 20 ms frames
    pub const VOICE: FrameFormat = FrameFormat {
        sample_rate: 48_000,
        channels: 2,
        frame_duration_ms: 20,
    };

    /// Samples per channel in one frame
    pub fn samples_per_channel(&self) -> usize {
        self.sample_rate as usize * self.frame_duration_ms as usize / 1000
    }

    /// Interleaved samples in one frame
    pub fn samples_per_frame(&self) -> usize {
        self.samples_per_channel() * self.channels as usize
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_millis(self.frame_duration_ms as u64)
    }
}

impl Default for FrameFormat {
    fn default() -> Self {
        Self::VOICE
    }
}

/// One encoded unit of audio, ready for the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
}

impl Frame {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<Vec<u8>> for Frame {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_frame_size() {
        let format = FrameFormat::VOICE;
        assert_eq!(format.samples_per_channel(), 960);
        assert_eq!(format.samples_per_frame(), 1920);
        assert_eq!(format.frame_duration(), Duration::from_millis(20));
    }

    #[test]
    fn test_longer_frames_scale() {
        let format = FrameFormat {
            frame_duration_ms: 60,
            ..FrameFormat::VOICE
        };
        assert_eq!(format.samples_per_channel(), 2880);
    }
}
