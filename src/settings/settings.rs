// Playback settings and persistence
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::audio::frame::FrameFormat;
use crate::error::SettingsError;

/// Frame durations a voice transport accepts
pub const ALLOWED_FRAME_DURATIONS_MS: [u32; 4] = [10, 20, 40, 60];

/// Stream loop and frame format settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    pub version: i32, // Settings schema version for future migrations
    pub frame_duration_ms: u32,
    /// Upper bound on how long an idle or paused loop sleeps between checks
    pub idle_interval_ms: u64,
    /// Per-frame delivery deadline before the transport is considered stalled
    pub send_timeout_ms: u64,
    /// Frames the ring buffer sink holds before `send` blocks
    pub sink_capacity: usize,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            version: 1,
            frame_duration_ms: FrameFormat::VOICE.frame_duration_ms,
            idle_interval_ms: 100,
            send_timeout_ms: 1000,
            sink_capacity: 100,
        }
    }
}

impl PlaybackSettings {
    /// Get the settings file path
    pub fn get_settings_path(app_dir: &Path) -> PathBuf {
        app_dir.join("settings.json")
    }

    /// Load settings from file, or return defaults if file doesn't exist
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            debug!(path = %path.display(), "No settings file found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let settings: PlaybackSettings = serde_json::from_str(&content)?;
        settings.validate()?;

        info!(path = %path.display(), "Loaded playback settings");
        Ok(settings)
    }

    /// Save settings to file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        self.validate()?;

        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;

        info!(path = %path.display(), "Saved playback settings");
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !ALLOWED_FRAME_DURATIONS_MS.contains(&self.frame_duration_ms) {
            return Err(SettingsError::Invalid(format!(
                "frame_duration_ms must be one of {:?}, got {}",
                ALLOWED_FRAME_DURATIONS_MS, self.frame_duration_ms
            )));
        }
        if self.idle_interval_ms == 0 {
            return Err(SettingsError::Invalid("idle_interval_ms must be positive".to_string()));
        }
        if self.send_timeout_ms == 0 {
            return Err(SettingsError::Invalid("send_timeout_ms must be positive".to_string()));
        }
        if self.sink_capacity == 0 {
            return Err(SettingsError::Invalid("sink_capacity must be positive".to_string()));
        }
        Ok(())
    }

    /// Frame format with the transport's fixed rate and channel count
    pub fn frame_format(&self) -> FrameFormat {
        FrameFormat {
            frame_duration_ms: self.frame_duration_ms,
            ..FrameFormat::VOICE
        }
    }

    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_interval_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}
