//! Directory listing and the background tag-reading worker.
//!
//! Listing happens on the caller's thread and is cheap. Tag parsing happens in
//! a [`MusicScanner`] on its own thread, which reports back over a channel with
//! one `Batch` and one `Finished` message.

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use lofty::prelude::{Accessor, AudioFile, TaggedFileExt};
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use crate::config::LibrarySettings;
use crate::error::LibraryError;

use super::song::{Field, Metadata, Song, format_duration};

/// Reads the tag fields of one file.
pub trait TagReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<Metadata, LibraryError>;
}

/// [`TagReader`] backed by `lofty`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTagReader;

impl TagReader for LoftyTagReader {
    fn read(&self, path: &Path) -> Result<Metadata, LibraryError> {
        let tagged = lofty::read_from_path(path)?;
        let mut metadata = Metadata::new();

        if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
            let fields = [
                (Field::Title, tag.title()),
                (Field::Artist, tag.artist()),
                (Field::Album, tag.album()),
                (Field::Genre, tag.genre()),
            ];
            for (field, value) in fields {
                if let Some(v) = value {
                    let v = v.trim();
                    if !v.is_empty() {
                        metadata.insert(field, v);
                    }
                }
            }
        }

        if metadata.get(Field::Title).is_none() {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("UNKNOWN");
            metadata.insert(Field::Title, stem);
        }
        metadata.insert(
            Field::Duration,
            format_duration(tagged.properties().duration()),
        );

        Ok(metadata)
    }
}

/// Identifies one scan for the lifetime of a [`LibraryModel`](super::LibraryModel).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ScanId(pub(super) u64);

/// What a scan worker sends back to the interactive thread.
#[derive(Debug)]
pub enum ScanMessage {
    /// Every song the scan could parse. Sent at most once per scan.
    Batch { id: ScanId, songs: Vec<Song> },
    /// The worker is done; its thread can be joined.
    Finished { id: ScanId },
}

pub(super) fn is_audio_file(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            extensions
                .iter()
                .map(|e| e.trim().trim_start_matches('.'))
                .any(|e| !e.is_empty() && e.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// List the files under `dir` whose extension is on the allow-list, sorted by
/// file name. Unreadable entries are skipped.
pub(super) fn list_candidates(dir: &Path, settings: &LibrarySettings) -> Vec<DirEntry> {
    let mut walker = WalkDir::new(dir)
        .follow_links(settings.follow_links)
        .sort_by_file_name();
    if !settings.recursive {
        walker = walker.max_depth(1);
    }

    walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && is_audio_file(e.path(), &settings.extensions))
        .collect()
}

/// Parses tags for a list of candidate files off the interactive thread.
pub struct MusicScanner {
    id: ScanId,
    entries: Vec<DirEntry>,
    reader: Arc<dyn TagReader>,
    cancelled: Arc<AtomicBool>,
}

impl MusicScanner {
    pub fn new(id: ScanId, entries: Vec<DirEntry>, reader: Arc<dyn TagReader>) -> Self {
        Self {
            id,
            entries,
            reader,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that stops the scan between two files once set.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    /// Read every candidate and keep the ones that parse.
    ///
    /// Returns `None` if the scan was cancelled part way.
    pub fn scan(&self) -> Option<Vec<Song>> {
        let mut songs = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            if self.cancelled.load(Ordering::Relaxed) {
                debug!(scan = self.id.0, "scan cancelled");
                return None;
            }

            let path = entry.path();
            match self.reader.read(path) {
                Ok(metadata) => songs.push(Song::new(path, metadata)),
                Err(e) => debug!(path = %path.display(), error = %e, "skipping unreadable file"),
            }
        }
        Some(songs)
    }

    /// Run [`scan`](Self::scan) on a new thread and report through `tx`.
    pub fn start(self, tx: Sender<ScanMessage>) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(format!("music-scanner-{}", self.id.0))
            .spawn(move || {
                let id = self.id;
                if let Some(songs) = self.scan() {
                    info!(
                        scan = id.0,
                        candidates = self.entries.len(),
                        parsed = songs.len(),
                        "scan complete"
                    );
                    // The model may have been dropped; nothing left to report to.
                    let _ = tx.send(ScanMessage::Batch { id, songs });
                }
                let _ = tx.send(ScanMessage::Finished { id });
            })
    }
}
