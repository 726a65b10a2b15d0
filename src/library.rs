//! The song library: tag extraction, background directory scans and the
//! table model the UI reads from.

mod events;
mod model;
mod scanner;
mod song;

pub use events::LibraryEvent;
pub use model::{LibraryModel, MediaQueue, NowPlaying, SortOrder};
pub use scanner::{LoftyTagReader, MusicScanner, ScanId, ScanMessage, TagReader};
pub use song::{Field, Metadata, Song, format_duration};

#[cfg(test)]
mod tests;
