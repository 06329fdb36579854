// Settings module
// Playback tuning loaded from a JSON file

#[allow(clippy::module_inception)]
pub mod settings;

pub use settings::PlaybackSettings;
