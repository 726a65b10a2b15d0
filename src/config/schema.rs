use std::path::PathBuf;

use serde::Deserialize;

/// Extensions every build treats as audio.
const BASE_EXTENSIONS: &[&str] = &[
    "mp3", "m4a", "mp4", "snd", "au", "aac", "adts", "aif", "aiff", "aifc", "caf", "sd2", "wav",
];

/// Extra formats the Linux build can decode.
const LINUX_EXTENSIONS: &[&str] = &["wma", "flv", "ogg", "flac"];

/// The built-in extension allow-list for the current platform.
pub fn default_extensions() -> Vec<String> {
    let mut exts: Vec<String> = BASE_EXTENSIONS.iter().map(|e| e.to_string()).collect();
    if cfg!(target_os = "linux") {
        exts.extend(LINUX_EXTENSIONS.iter().map(|e| e.to_string()));
    }
    exts
}

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/astoria/config.toml` or `~/.config/astoria/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `ASTORIA__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub library: LibrarySettings,
    pub playback: PlaybackSettings,
    pub audio: AudioSettings,
    pub ui: UiSettings,
    pub controls: ControlsSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Directory scanned at startup when none is given on the command line.
    pub directory: Option<PathBuf>,
    /// File extensions to treat as audio (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// Whether to descend into subdirectories. Off by default: only the
    /// entries directly under the chosen directory are scanned.
    pub recursive: bool,
    /// Whether to follow symlinks during scanning.
    pub follow_links: bool,
    /// Whether to include hidden files/directories (dotfiles).
    pub include_hidden: bool,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            directory: None,
            extensions: default_extensions(),
            recursive: false,
            follow_links: true,
            include_hidden: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Below this much elapsed time "previous" goes to the previous song;
    /// above it, it restarts the current one (milliseconds).
    pub previous_threshold_ms: u64,
    /// Loop mode at startup.
    pub loop_mode: LoopModeSetting,
    /// Whether shuffle starts enabled.
    pub shuffle: bool,
    /// Initial volume, 0..=100.
    pub volume: u8,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            previous_threshold_ms: 10_000,
            loop_mode: LoopModeSetting::NoLoop,
            shuffle: false,
            volume: 100,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoopModeSetting {
    #[serde(alias = "no_loop", alias = "no-loop", alias = "sequential")]
    NoLoop,
    #[serde(
        alias = "loopall",
        alias = "loop_all",
        alias = "loop-all",
        alias = "repeat-all"
    )]
    LoopAll,
    #[serde(
        alias = "loopone",
        alias = "loop_one",
        alias = "loop-one",
        alias = "repeat-one"
    )]
    LoopOne,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Fade-out duration when quitting (milliseconds).
    /// Set to 0 to stop immediately.
    pub quit_fade_out_ms: u64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            quit_fade_out_ms: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// Title of the library table block.
    pub header_text: String,
    /// Mirror "artist - title" of the current track into the terminal title.
    pub set_terminal_title: bool,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            header_text: " astoria ".to_string(),
            set_terminal_title: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlsSettings {
    /// Number of seconds to scrub when pressing `H` / `L`.
    pub scrub_seconds: u64,
}

impl Default for ControlsSettings {
    fn default() -> Self {
        Self { scrub_seconds: 5 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    /// Log file. Logging is disabled when unset, since the terminal is
    /// owned by the UI.
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}
