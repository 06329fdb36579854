//! Streaming sample rate conversion using rubato
//!
//! Decoded packets arrive in arbitrary sizes while rubato's fixed-input
//! resamplers want exact chunks, so input is staged per channel and fed
//! through in `input_frames_next()` sized pieces.

use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::debug;

use crate::error::{DecodeError, EncodeError};

/// Input frames handed to rubato per call
const CHUNK_FRAMES: usize = 1024;

pub struct StreamResampler {
    inner: FastFixedIn<f32>,
    channels: usize,
    ratio: f64,
    /// Planar input not yet resampled
    pending: Vec<Vec<f32>>,
}

impl StreamResampler {
    pub fn new(input_rate: u32, output_rate: u32, channels: usize) -> Result<Self, EncodeError> {
        let ratio = output_rate as f64 / input_rate as f64;
        let inner = FastFixedIn::<f32>::new(
            ratio,
            1.0, // no runtime ratio changes
            PolynomialDegree::Septic,
            CHUNK_FRAMES,
            channels,
        )
        .map_err(|e| EncodeError::Resampler(e.to_string()))?;

        debug!(input_rate, output_rate, channels, "Created resampler");

        Ok(Self {
            inner,
            channels,
            ratio,
            pending: vec![Vec::with_capacity(CHUNK_FRAMES * 2); channels],
        })
    }

    /// Stage interleaved input; returns whatever interleaved output the
    /// complete chunks produced.
    pub fn push(&mut self, interleaved: &[f32]) -> Result<Vec<f32>, DecodeError> {
        for frame in interleaved.chunks_exact(self.channels) {
            for (ch, sample) in frame.iter().enumerate() {
                self.pending[ch].push(*sample);
            }
        }

        let mut output = Vec::new();
        loop {
            let needed = self.inner.input_frames_next();
            if self.pending[0].len() < needed {
                break;
            }
            let chunk: Vec<Vec<f32>> = self
                .pending
                .iter_mut()
                .map(|ch| ch.drain(..needed).collect())
                .collect();
            let planar = self
                .inner
                .process(&chunk, None)
                .map_err(|e| DecodeError::Resample(e.to_string()))?;
            interleave_into(&planar, usize::MAX, &mut output);
        }
        Ok(output)
    }

    /// Resample what is left at end of stream.
    pub fn flush(&mut self) -> Result<Vec<f32>, DecodeError> {
        let remaining = self.pending[0].len();
        let mut output = Vec::new();
        if remaining == 0 {
            return Ok(output);
        }

        let chunk: Vec<Vec<f32>> = self.pending.iter_mut().map(std::mem::take).collect();
        let planar = self
            .inner
            .process_partial(Some(chunk.as_slice()), None)
            .map_err(|e| DecodeError::Resample(e.to_string()))?;

        // process_partial zero-pads to a full chunk; keep only real audio
        let expected = (remaining as f64 * self.ratio).round() as usize;
        interleave_into(&planar, expected, &mut output);
        Ok(output)
    }
}

/// Append up to `max_frames` frames of planar audio to `out`, interleaved.
fn interleave_into(planar: &[Vec<f32>], max_frames: usize, out: &mut Vec<f32>) {
    let Some(first) = planar.first() else {
        return;
    };
    let frames = first.len().min(max_frames);
    out.reserve(frames * planar.len());
    for frame_idx in 0..frames {
        for channel in planar {
            out.push(channel[frame_idx]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(frames: usize, rate: u32) -> Vec<f32> {
        let mut out = Vec::with_capacity(frames * 2);
        for i in 0..frames {
            let t = i as f32 / rate as f32;
            let sample = (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5;
            out.push(sample);
            out.push(sample);
        }
        out
    }

    #[test]
    fn test_interleave_into_limits_frames() {
        let planar = vec![vec![1.0, 3.0, 5.0], vec![2.0, 4.0, 6.0]];
        let mut out = Vec::new();
        interleave_into(&planar, 2, &mut out);
        assert_eq!(out, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_small_push_is_staged() {
        let mut resampler = StreamResampler::new(44100, 48000, 2).unwrap();
        let out = resampler.push(&sine(100, 44100)).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_total_output_tracks_ratio() {
        let input_rate = 44100;
        let input_frames = 44100; // 1 second
        let mut resampler = StreamResampler::new(input_rate, 48000, 2).unwrap();

        let input = sine(input_frames, input_rate);
        let mut output = Vec::new();
        for packet in input.chunks(1152 * 2) {
            output.extend(resampler.push(packet).unwrap());
        }
        output.extend(resampler.flush().unwrap());

        let output_frames = output.len() / 2;
        assert!(
            (47_900..=48_100).contains(&output_frames),
            "Expected ~48000 frames, got {}",
            output_frames
        );
    }

    #[test]
    fn test_flush_empty_is_noop() {
        let mut resampler = StreamResampler::new(44100, 48000, 2).unwrap();
        assert!(resampler.flush().unwrap().is_empty());
    }
}
