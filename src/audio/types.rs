//! Commands, events and shared state of the audio engine.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum PlayerState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCmd {
    /// Load the file and start playing it from the beginning.
    Play(PathBuf),
    Pause,
    Resume,
    /// Stop playback and unload the file.
    Stop,
    /// Jump back to the start of the current file.
    Rewind,
    /// Jump to this position inside the current file.
    Seek(Duration),
    /// Set the volume, 0..=100.
    SetVolume(u8),
    SetMuted(bool),
    /// Quit the audio thread, optionally fading out over `fade_out_ms` milliseconds.
    Quit { fade_out_ms: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    /// The file played to its end.
    TrackEnded(PathBuf),
    /// Output or decoding failed. `path` is `None` when no device could be opened.
    Failed {
        path: Option<PathBuf>,
        reason: String,
    },
}

/// Runtime playback information shared with the UI.
#[derive(Debug, Clone)]
pub struct PlaybackInfo {
    /// File currently loaded, if any.
    pub path: Option<PathBuf>,
    pub state: PlayerState,
    /// Position inside the current file.
    pub elapsed: Duration,
    pub volume: u8,
    pub muted: bool,
}

impl Default for PlaybackInfo {
    fn default() -> Self {
        Self {
            path: None,
            state: PlayerState::Stopped,
            elapsed: Duration::ZERO,
            volume: 100,
            muted: false,
        }
    }
}

pub type PlaybackHandle = Arc<Mutex<PlaybackInfo>>;

/// Sink gain for a 0..=100 volume.
pub fn effective_volume(volume: u8, muted: bool) -> f32 {
    if muted {
        0.0
    } else {
        f32::from(volume.min(100)) / 100.0
    }
}
