//! Playback engine.
//!
//! A dedicated thread owns the `rodio` output stream and the current sink.
//! The interactive thread drives it with [`PlayerCmd`]s, reads progress from a
//! shared [`PlaybackHandle`] and learns about finished or failed tracks from
//! [`PlayerEvent`]s.

mod player;
mod sink;
mod thread;
mod types;

pub use player::AudioPlayer;
pub use types::*;
