// Audio decoder using Symphonia
// Decodes in-memory compressed audio to interleaved f32 PCM

use std::io::Cursor;

use symphonia::core::audio::{SampleBuffer, SignalSpec};
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::error::{DecodeError, EncodeError};

pub struct AudioDecoder {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: usize,
    sample_buf: Option<SampleBuffer<f32>>,
}

impl AudioDecoder {
    /// Probe compressed bytes and prepare for decoding.
    /// `extension` is an optional format hint such as "mp3".
    pub fn open_bytes(data: Vec<u8>, extension: Option<&str>) -> Result<Self, EncodeError> {
        let mss = MediaSourceStream::new(Box::new(Cursor::new(data)), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = extension {
            hint.with_extension(ext);
        }

        // Probe the media source
        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| EncodeError::Probe(e.to_string()))?;

        let format = probed.format;

        // Find the first audio track
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(EncodeError::NoTrack)?;

        let track_id = track.id;
        let sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
        let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(2);

        let duration_ms = track
            .codec_params
            .n_frames
            .map(|frames| (frames as f64 / sample_rate as f64 * 1000.0) as i64);

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| EncodeError::Decoder(e.to_string()))?;

        debug!(sample_rate, channels, ?duration_ms, "Opened audio input");

        Ok(Self {
            format,
            decoder,
            track_id,
            sample_rate,
            channels,
            sample_buf: None,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Decode next packet, returns interleaved f32 samples at the native
    /// rate and channel count. Returns None when end of stream is reached.
    pub fn decode_next(&mut self) -> Result<Option<Vec<f32>>, DecodeError> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(None);
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(e) => return Err(DecodeError::Packet(e.to_string())),
            };

            // Skip packets from other tracks
            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = SignalSpec::new(decoded.spec().rate, decoded.spec().channels);
                    let frames = decoded.capacity();
                    // SampleBuffer capacity is counted in samples, not frames
                    let needs_realloc = self
                        .sample_buf
                        .as_ref()
                        .map_or(true, |buf| buf.capacity() < frames * spec.channels.count());
                    if needs_realloc {
                        self.sample_buf = Some(SampleBuffer::<f32>::new(frames as u64, spec));
                    }
                    let Some(buf) = self.sample_buf.as_mut() else {
                        return Err(DecodeError::Decode("sample buffer unavailable".to_string()));
                    };
                    buf.copy_interleaved_ref(decoded);
                    return Ok(Some(buf.samples().to_vec()));
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    // Corrupt packet, skip it
                    warn!(error = %e, "Decode error (skipping packet)");
                    continue;
                }
                Err(e) => return Err(DecodeError::Decode(e.to_string())),
            }
        }
    }
}
