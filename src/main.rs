//! voxframe - stream an audio file through a frame player
//!
//! Decodes the input into 20 ms PCM frames, pushes them through a
//! `Player` into a ring buffer sink and drains that sink the way a voice
//! transport would, optionally writing length-prefixed frames to a file.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use voxframe::{
    ring_buffer_sink, EncoderOpener, FrameReceiver, PlaybackOutcome, PlaybackSettings, Player,
};

/// How long the transport waits for a frame before checking for disconnect
const TRANSPORT_POLL: Duration = Duration::from_millis(50);

/// Command-line arguments for voxframe
#[derive(Parser, Debug)]
#[command(name = "voxframe")]
#[command(about = "Stream an audio file as fixed-size voice frames")]
#[command(version)]
struct Args {
    /// Compressed audio file to play (mp3, flac, ogg, wav, m4a)
    input: PathBuf,

    /// Write length-prefixed frames to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Playback settings JSON file
    #[arg(short, long, env = "VOXFRAME_SETTINGS")]
    settings: Option<PathBuf>,

    /// Drain frames at the frame cadence instead of as fast as possible
    #[arg(long)]
    realtime: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voxframe=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let settings = match &args.settings {
        Some(path) => PlaybackSettings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => PlaybackSettings::default(),
    };

    let audio = std::fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    info!(input = %args.input.display(), bytes = audio.len(), "Read audio input");

    let output = match &args.output {
        Some(path) => Some(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => None,
    };

    let (sink, receiver) = ring_buffer_sink(settings.sink_capacity);
    let pace = args
        .realtime
        .then(|| settings.frame_format().frame_duration());
    let transport = tokio::task::spawn_blocking(move || run_transport(receiver, output, pace));

    let mut opener = EncoderOpener::pcm();
    if let Some(ext) = args.input.extension().and_then(|e| e.to_str()) {
        opener = opener.with_extension_hint(ext);
    }

    let player = Player::start(Arc::new(sink), opener, settings, audio)
        .context("Failed to start playback")?;

    let outcome = player.wait_for_end_async().await;
    player.close().context("Failed to close transport")?;

    let written = transport.await.context("Transport task failed")??;
    let stats = player.stats();
    info!(
        ?outcome,
        frames_sent = stats.frames_sent,
        frames_written = written,
        "Playback done"
    );

    if outcome != Some(PlaybackOutcome::Finished) {
        bail!("Playback ended early: {:?}", outcome);
    }
    Ok(())
}

/// Drain frames until the sink is disconnected and emptied
fn run_transport(
    receiver: FrameReceiver,
    mut output: Option<BufWriter<File>>,
    pace: Option<Duration>,
) -> Result<u64> {
    let mut received = 0u64;

    loop {
        match receiver.recv_timeout(TRANSPORT_POLL) {
            Some(frame) => {
                if let Some(out) = output.as_mut() {
                    out.write_all(&(frame.len() as u32).to_le_bytes())?;
                    out.write_all(frame.as_bytes())?;
                }
                received += 1;
                if let Some(interval) = pace {
                    thread::sleep(interval);
                }
            }
            None if receiver.is_disconnected() => break,
            None => {}
        }
    }

    if let Some(mut out) = output {
        out.flush()?;
    }
    if received == 0 {
        warn!("Transport received no frames");
    }
    Ok(received)
}
