//! The library table: the list of songs the UI shows, and every operation
//! that changes it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::LibrarySettings;
use crate::error::LibraryError;

use super::events::LibraryEvent;
use super::scanner::{MusicScanner, ScanId, ScanMessage, TagReader, list_candidates};
use super::song::{Field, Song};

/// The playback queue as seen by the library: it only ever gets appended to.
pub trait MediaQueue {
    fn add_media(&mut self, locator: &Path);
}

/// Reports which file is currently loaded for playback.
pub trait NowPlaying {
    fn current_media(&self) -> Option<PathBuf>;
}

/// Direction the next `sort_by_column` call will use.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }
}

struct RunningScan {
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

/// In-memory song table.
///
/// Only the owning (interactive) thread mutates it. Scans run on worker
/// threads and hand their batches back through [`poll_scans`](Self::poll_scans)
/// or [`wait_for_scans`](Self::wait_for_scans).
pub struct LibraryModel {
    songs: Vec<Song>,
    sort: SortOrder,
    last_sort: Option<SortOrder>,
    might_be_updated: Option<usize>,

    settings: LibrarySettings,
    reader: Arc<dyn TagReader>,
    queue: Box<dyn MediaQueue>,
    now_playing: Box<dyn NowPlaying>,

    subscribers: Vec<Sender<LibraryEvent>>,

    scan_tx: Sender<ScanMessage>,
    scan_rx: Receiver<ScanMessage>,
    scans: HashMap<ScanId, RunningScan>,
    next_scan_id: u64,
}

impl LibraryModel {
    pub fn new(
        settings: LibrarySettings,
        reader: Arc<dyn TagReader>,
        queue: Box<dyn MediaQueue>,
        now_playing: Box<dyn NowPlaying>,
    ) -> Self {
        let (scan_tx, scan_rx) = mpsc::channel();
        Self {
            songs: Vec::new(),
            sort: SortOrder::default(),
            last_sort: None,
            might_be_updated: None,
            settings,
            reader,
            queue,
            now_playing,
            subscribers: Vec::new(),
            scan_tx,
            scan_rx,
            scans: HashMap::new(),
            next_scan_id: 0,
        }
    }

    /// Receive every event emitted from now on, in emission order.
    pub fn subscribe(&mut self) -> Receiver<LibraryEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: LibraryEvent) {
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }

    /// The effective extension allow-list.
    pub fn supported_formats(&self) -> &[String] {
        &self.settings.extensions
    }

    // ---- scanning ----

    /// List `dir` and start a background scan of the matching files.
    ///
    /// Returns as soon as the worker is running; the songs arrive through
    /// `poll_scans`/`wait_for_scans`.
    pub fn scan_directory(&mut self, dir: &Path) -> Result<ScanId, LibraryError> {
        if !dir.is_dir() {
            return Err(LibraryError::NotADirectory(dir.to_path_buf()));
        }

        let entries = list_candidates(dir, &self.settings);
        let id = ScanId(self.next_scan_id);
        self.next_scan_id += 1;
        info!(scan = id.0, dir = %dir.display(), candidates = entries.len(), "starting scan");

        let scanner = MusicScanner::new(id, entries, self.reader.clone());
        let cancel = scanner.cancel_flag();
        let handle = scanner.start(self.scan_tx.clone())?;
        self.scans.insert(
            id,
            RunningScan {
                cancel,
                handle: Some(handle),
            },
        );
        Ok(id)
    }

    pub fn is_scanning(&self) -> bool {
        !self.scans.is_empty()
    }

    /// Merge whatever the scan workers have finished so far. Never blocks.
    ///
    /// Returns the number of songs added.
    pub fn poll_scans(&mut self) -> usize {
        self.drain_scan_messages() + self.reap_dead_scans()
    }

    fn drain_scan_messages(&mut self) -> usize {
        let mut added = 0;
        while let Ok(msg) = self.scan_rx.try_recv() {
            added += self.handle_scan_message(msg);
        }
        added
    }

    /// Block until every running scan has reported back.
    ///
    /// Returns the number of songs added.
    pub fn wait_for_scans(&mut self) -> usize {
        let mut added = 0;
        while !self.scans.is_empty() {
            match self.scan_rx.recv_timeout(Duration::from_millis(100)) {
                Ok(msg) => added += self.handle_scan_message(msg),
                Err(RecvTimeoutError::Timeout) => added += self.reap_dead_scans(),
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        added
    }

    /// Ask every running scan to stop. Cancelled scans deliver no batch.
    pub fn cancel_scans(&mut self) {
        for scan in self.scans.values() {
            scan.cancel.store(true, Ordering::Relaxed);
        }
    }

    fn handle_scan_message(&mut self, msg: ScanMessage) -> usize {
        match msg {
            ScanMessage::Batch { id, songs } => {
                debug!(scan = id.0, songs = songs.len(), "merging scan batch");
                self.update_library(songs)
            }
            ScanMessage::Finished { id } => {
                if let Some(mut scan) = self.scans.remove(&id) {
                    if let Some(h) = scan.handle.take() {
                        let _ = h.join();
                    }
                }
                0
            }
        }
    }

    // A worker that panicked never sends `Finished`. A worker that exited
    // normally has already queued its messages, so drain before reaping.
    fn reap_dead_scans(&mut self) -> usize {
        let exited: Vec<ScanId> = self
            .scans
            .iter()
            .filter(|(_, scan)| scan.handle.as_ref().is_some_and(|h| h.is_finished()))
            .map(|(id, _)| *id)
            .collect();
        if exited.is_empty() {
            return 0;
        }

        let added = self.drain_scan_messages();
        for id in exited {
            if self.scans.remove(&id).is_some() {
                warn!(scan = id.0, "scan worker exited without reporting");
            }
        }
        added
    }

    // ---- mutation ----

    /// Append the songs whose path is not in the table yet.
    ///
    /// Each accepted song gets a `RowInserted` event and its locator appended
    /// to the playback queue, in that order. One `LibraryChanged` follows if
    /// anything was accepted. Returns the number accepted.
    pub fn update_library(&mut self, batch: Vec<Song>) -> usize {
        if batch.is_empty() {
            return 0;
        }

        let mut added = 0;
        for song in batch {
            if self.songs.iter().any(|s| s.path() == song.path()) {
                continue;
            }

            let row = self.songs.len();
            self.songs.push(song);
            self.emit(LibraryEvent::RowInserted(row));
            self.queue.add_media(self.songs[row].path());
            added += 1;
        }

        if added > 0 {
            info!(added, total = self.songs.len(), "library updated");
            self.emit(LibraryEvent::LibraryChanged);
        }
        added
    }

    /// Sort the whole table by `column`'s text, alternating direction on
    /// every call.
    ///
    /// Comparison is plain string order for every column, Duration included,
    /// so "10:00" sorts before "9:00". Ties keep their current relative order.
    /// An unknown column leaves the table and the direction untouched.
    pub fn sort_by_column(&mut self, column: usize) {
        let Some(field) = Field::from_column(column) else {
            debug!(column, "ignoring sort on unknown column");
            return;
        };

        match self.sort {
            SortOrder::Ascending => self
                .songs
                .sort_by(|a, b| a.metadata().value(field).cmp(b.metadata().value(field))),
            SortOrder::Descending => self
                .songs
                .sort_by(|a, b| b.metadata().value(field).cmp(a.metadata().value(field))),
        }
        self.last_sort = Some(self.sort);
        self.sort = self.sort.toggled();
        self.emit(LibraryEvent::FullTableChanged);
    }

    /// Remember `row` as the target of the next [`update_metadata`](Self::update_metadata).
    pub fn index_might_be_updated(&mut self, row: usize) {
        self.might_be_updated = Some(row);
    }

    /// Re-read the tags of the marked row after an outside edit.
    ///
    /// Emits `FullTableChanged`, then `TrackMetadataChanged` if the row is the
    /// song currently loaded for playback. If the file can no longer be read
    /// the previous metadata stays in place.
    pub fn update_metadata(&mut self) -> Result<(), LibraryError> {
        let row = self.might_be_updated.ok_or(LibraryError::NoPendingEdit)?;
        let len = self.songs.len();
        let song = self
            .songs
            .get_mut(row)
            .ok_or(LibraryError::RowOutOfRange { row, len })?;

        match self.reader.read(song.path()) {
            Ok(metadata) => song.replace_metadata(metadata),
            Err(e) => warn!(path = %song.path().display(), error = %e, "keeping stale metadata"),
        }
        let path = song.path().to_path_buf();

        self.emit(LibraryEvent::FullTableChanged);
        if self.now_playing.current_media().as_deref() == Some(path.as_path()) {
            self.emit(LibraryEvent::TrackMetadataChanged);
        }
        Ok(())
    }

    // ---- read access ----

    pub fn row_count(&self) -> usize {
        self.songs.len()
    }

    pub fn column_count(&self) -> usize {
        Field::ALL.len()
    }

    pub fn header_data(&self, section: usize) -> Option<&'static str> {
        Field::from_column(section).map(Field::header)
    }

    /// Cell text. `None` outside the table, `Some("")` for a missing tag.
    pub fn data(&self, row: usize, column: usize) -> Option<&str> {
        let field = Field::from_column(column)?;
        self.songs.get(row).map(|s| s.metadata().value(field))
    }

    pub fn song_at(&self, row: usize) -> Option<&Song> {
        self.songs.get(row)
    }

    /// Locator of the song at `row`.
    pub fn get(&self, row: usize) -> Option<PathBuf> {
        self.songs.get(row).map(|s| s.path().to_path_buf())
    }

    pub fn position_of(&self, path: &Path) -> Option<usize> {
        self.songs.iter().position(|s| s.path() == path)
    }

    #[cfg(test)]
    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    /// Direction the next sort will use.
    pub fn sort_order(&self) -> SortOrder {
        self.sort
    }

    /// Direction of the most recent sort, `None` if the table was never sorted.
    pub fn last_sort(&self) -> Option<SortOrder> {
        self.last_sort
    }

    #[cfg(test)]
    pub fn marked_row(&self) -> Option<usize> {
        self.might_be_updated
    }
}
