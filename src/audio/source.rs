// Frame sources: compressed audio in, fixed-size encoded frames out
//
// The codec that produces the transport's wire format is supplied by the
// caller through `FrameEncoder`; `PcmEncoder` passes samples through as
// little-endian s16 so the pipeline works without one.

use std::collections::VecDeque;

use tracing::debug;

use super::decoder::AudioDecoder;
use super::frame::{Frame, FrameFormat};
use super::resampler::StreamResampler;
use crate::error::{DecodeError, EncodeError};

/// Lazy, finite sequence of encoded frames.
pub trait FrameSource: Send {
    /// Next frame, `Ok(None)` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>, DecodeError>;

    /// Release decoding buffers. Pulls after cleanup report end of stream.
    fn cleanup(&mut self);
}

/// Turns one frame of interleaved i16 PCM into the transport's encoding.
pub trait FrameEncoder: Send {
    fn encode(&mut self, pcm: &[i16]) -> Result<Frame, DecodeError>;
}

/// Builds a frame source from raw compressed bytes.
pub trait SourceOpener: Send + Sync {
    fn open(&self, audio: Vec<u8>, format: FrameFormat)
        -> Result<Box<dyn FrameSource>, EncodeError>;
}

/// Raw little-endian s16 frames
#[derive(Debug, Default, Clone, Copy)]
pub struct PcmEncoder;

impl FrameEncoder for PcmEncoder {
    fn encode(&mut self, pcm: &[i16]) -> Result<Frame, DecodeError> {
        let mut data = Vec::with_capacity(pcm.len() * 2);
        for sample in pcm {
            data.extend_from_slice(&sample.to_le_bytes());
        }
        Ok(Frame::new(data))
    }
}

/// Opens `EncodedFrameSource`s with a fresh encoder per play cycle
pub struct EncoderOpener<F> {
    make_encoder: F,
    extension_hint: Option<String>,
}

impl<F> EncoderOpener<F> {
    pub fn new(make_encoder: F) -> Self {
        Self {
            make_encoder,
            extension_hint: None,
        }
    }

    /// Format hint for the prober, e.g. "mp3"
    pub fn with_extension_hint(mut self, extension: impl Into<String>) -> Self {
        self.extension_hint = Some(extension.into());
        self
    }
}

impl EncoderOpener<fn() -> PcmEncoder> {
    pub fn pcm() -> Self {
        Self::new(PcmEncoder::default as fn() -> PcmEncoder)
    }
}

impl<F, E> SourceOpener for EncoderOpener<F>
where
    F: Fn() -> E + Send + Sync,
    E: FrameEncoder + 'static,
{
    fn open(
        &self,
        audio: Vec<u8>,
        format: FrameFormat,
    ) -> Result<Box<dyn FrameSource>, EncodeError> {
        let source = EncodedFrameSource::open(
            audio,
            self.extension_hint.as_deref(),
            format,
            (self.make_encoder)(),
        )?;
        Ok(Box::new(source))
    }
}

/// Decode -> channel map -> resample -> slice -> encode
pub struct EncodedFrameSource<E> {
    decoder: Option<AudioDecoder>,
    resampler: Option<StreamResampler>,
    encoder: E,
    format: FrameFormat,
    input_channels: usize,
    /// Interleaved PCM at the target format, waiting to be framed
    pcm: VecDeque<f32>,
    drained: bool,
}

impl<E: FrameEncoder> EncodedFrameSource<E> {
    pub fn open(
        audio: Vec<u8>,
        extension: Option<&str>,
        format: FrameFormat,
        encoder: E,
    ) -> Result<Self, EncodeError> {
        let decoder = AudioDecoder::open_bytes(audio, extension)?;
        let input_channels = decoder.channels();

        let resampler = if decoder.sample_rate() != format.sample_rate {
            Some(StreamResampler::new(
                decoder.sample_rate(),
                format.sample_rate,
                format.channels as usize,
            )?)
        } else {
            None
        };

        debug!(
            input_rate = decoder.sample_rate(),
            input_channels,
            resampling = resampler.is_some(),
            "Frame source ready"
        );

        Ok(Self {
            decoder: Some(decoder),
            resampler,
            encoder,
            format,
            input_channels,
            pcm: VecDeque::with_capacity(format.samples_per_frame() * 4),
            drained: false,
        })
    }

    /// Decode until a whole frame is buffered or the input runs out
    fn fill(&mut self) -> Result<(), DecodeError> {
        let wanted = self.format.samples_per_frame();
        while self.pcm.len() < wanted && !self.drained {
            let Some(decoder) = self.decoder.as_mut() else {
                self.drained = true;
                break;
            };

            match decoder.decode_next()? {
                Some(samples) => {
                    let mapped = map_channels(
                        &samples,
                        self.input_channels,
                        self.format.channels as usize,
                    );
                    let ready = match self.resampler.as_mut() {
                        Some(resampler) => resampler.push(&mapped)?,
                        None => mapped,
                    };
                    self.pcm.extend(ready);
                }
                None => {
                    self.drained = true;
                    if let Some(resampler) = self.resampler.as_mut() {
                        self.pcm.extend(resampler.flush()?);
                    }
                }
            }
        }
        Ok(())
    }
}

impl<E: FrameEncoder> FrameSource for EncodedFrameSource<E> {
    fn next_frame(&mut self) -> Result<Option<Frame>, DecodeError> {
        self.fill()?;
        if self.pcm.is_empty() {
            return Ok(None);
        }

        let wanted = self.format.samples_per_frame();
        let available = wanted.min(self.pcm.len());
        let mut pcm: Vec<i16> = self.pcm.drain(..available).map(to_i16).collect();
        // Last frame of the stream is padded with silence
        pcm.resize(wanted, 0);

        self.encoder.encode(&pcm).map(Some)
    }

    fn cleanup(&mut self) {
        self.decoder = None;
        self.resampler = None;
        self.pcm = VecDeque::new();
        self.drained = true;
    }
}

/// Remap interleaved samples between channel counts. Mono is duplicated,
/// channels beyond the target are dropped.
fn map_channels(samples: &[f32], from: usize, to: usize) -> Vec<f32> {
    if from == to || from == 0 {
        return samples.to_vec();
    }

    let frames = samples.len() / from;
    let mut out = Vec::with_capacity(frames * to);
    for frame in samples.chunks_exact(from) {
        for ch in 0..to {
            out.push(frame[ch.min(from - 1)]);
        }
    }
    out
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavSpec, WavWriter};
    use std::io::Cursor;

    fn wav_bytes(sample_rate: u32, channels: u16, frames: usize) -> Vec<u8> {
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
            for i in 0..frames * channels as usize {
                writer.write_sample(((i % 200) as i16 - 100) * 50).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    fn drain<S: FrameSource>(source: &mut S) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Some(frame) = source.next_frame().unwrap() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn test_map_channels_duplicates_mono() {
        assert_eq!(map_channels(&[0.1, 0.2], 1, 2), vec![0.1, 0.1, 0.2, 0.2]);
    }

    #[test]
    fn test_map_channels_drops_extra_channels() {
        assert_eq!(
            map_channels(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3, 2),
            vec![1.0, 2.0, 4.0, 5.0]
        );
    }

    #[test]
    fn test_to_i16_clamps() {
        assert_eq!(to_i16(2.0), i16::MAX);
        assert_eq!(to_i16(-2.0), -i16::MAX);
        assert_eq!(to_i16(0.0), 0);
    }

    #[test]
    fn test_pcm_encoder_little_endian() {
        let frame = PcmEncoder.encode(&[1, -2]).unwrap();
        assert_eq!(frame.as_bytes(), &[0x01, 0x00, 0xFE, 0xFF]);
    }

    #[test]
    fn test_native_format_frames_exactly() {
        // 100ms at 48kHz stereo is five 20ms frames
        let audio = wav_bytes(48_000, 2, 4_800);
        let mut source =
            EncodedFrameSource::open(audio, Some("wav"), FrameFormat::VOICE, PcmEncoder).unwrap();

        let frames = drain(&mut source);
        assert_eq!(frames.len(), 5);
        assert!(frames.iter().all(|f| f.len() == 1920 * 2));
    }

    #[test]
    fn test_partial_tail_is_padded() {
        let audio = wav_bytes(48_000, 2, 1_000);
        let mut source =
            EncodedFrameSource::open(audio, None, FrameFormat::VOICE, PcmEncoder).unwrap();

        let frames = drain(&mut source);
        assert_eq!(frames.len(), 2);
        let tail = frames[1].as_bytes();
        assert_eq!(tail.len(), 1920 * 2);
        // 40 real frames * 2 channels * 2 bytes, then silence
        assert!(tail[160..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_mono_44k_is_converted() {
        let audio = wav_bytes(44_100, 1, 4_410);
        let mut source =
            EncodedFrameSource::open(audio, Some("wav"), FrameFormat::VOICE, PcmEncoder).unwrap();

        let frames = drain(&mut source);
        assert!((5..=6).contains(&frames.len()), "got {} frames", frames.len());
        assert!(frames.iter().all(|f| f.len() == 1920 * 2));
    }

    #[test]
    fn test_cleanup_ends_stream() {
        let audio = wav_bytes(48_000, 2, 4_800);
        let mut source =
            EncodedFrameSource::open(audio, None, FrameFormat::VOICE, PcmEncoder).unwrap();

        assert!(source.next_frame().unwrap().is_some());
        source.cleanup();
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_garbage_input_is_encode_error() {
        let result = EncodedFrameSource::open(
            b"definitely not audio".to_vec(),
            None,
            FrameFormat::VOICE,
            PcmEncoder,
        );
        assert!(matches!(result, Err(EncodeError::Probe(_))));
    }

    #[test]
    fn test_opener_builds_boxed_source() {
        let opener = EncoderOpener::pcm().with_extension_hint("wav");
        let mut source = opener
            .open(wav_bytes(48_000, 2, 960), FrameFormat::VOICE)
            .unwrap();
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_none());
    }
}
