use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tempfile::tempdir;

use super::scanner::{is_audio_file, list_candidates};
use super::*;
use crate::config::LibrarySettings;
use crate::error::LibraryError;

/// Tag reader that answers from a table keyed by file name.
#[derive(Default)]
struct FakeTags {
    by_name: Mutex<HashMap<String, Metadata>>,
}

impl FakeTags {
    fn with(entries: &[(&str, &str)]) -> Arc<Self> {
        let tags = Self::default();
        for (name, title) in entries {
            tags.set(name, Metadata::new().with(Field::Title, *title));
        }
        Arc::new(tags)
    }

    fn set(&self, name: &str, metadata: Metadata) {
        self.by_name
            .lock()
            .unwrap()
            .insert(name.to_string(), metadata);
    }
}

impl TagReader for FakeTags {
    fn read(&self, path: &Path) -> Result<Metadata, LibraryError> {
        let name = path.file_name().and_then(|s| s.to_str()).unwrap_or_default();
        self.by_name
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| LibraryError::Io(io::Error::other("no tags")))
    }
}

/// Tag reader whose reads block until `release` is called.
struct GatedTags {
    inner: Arc<FakeTags>,
    open: AtomicBool,
}

impl GatedTags {
    fn new(inner: Arc<FakeTags>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            open: AtomicBool::new(false),
        })
    }

    fn release(&self) {
        self.open.store(true, Ordering::SeqCst);
    }
}

impl TagReader for GatedTags {
    fn read(&self, path: &Path) -> Result<Metadata, LibraryError> {
        while !self.open.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(5));
        }
        self.inner.read(path)
    }
}

type Appended = Arc<Mutex<Vec<PathBuf>>>;

struct RecordingQueue(Appended);

impl MediaQueue for RecordingQueue {
    fn add_media(&mut self, locator: &Path) {
        self.0.lock().unwrap().push(locator.to_path_buf());
    }
}

struct FixedNowPlaying(Option<PathBuf>);

impl NowPlaying for FixedNowPlaying {
    fn current_media(&self) -> Option<PathBuf> {
        self.0.clone()
    }
}

fn model_with(
    tags: Arc<dyn TagReader>,
    now_playing: Option<PathBuf>,
) -> (LibraryModel, Appended) {
    let appended: Appended = Arc::default();
    let model = LibraryModel::new(
        LibrarySettings::default(),
        tags,
        Box::new(RecordingQueue(appended.clone())),
        Box::new(FixedNowPlaying(now_playing)),
    );
    (model, appended)
}

fn touch(dir: &Path, name: &str) -> PathBuf {
    let p = dir.join(name);
    fs::write(&p, b"not really audio").unwrap();
    p
}

fn song(path: &str, title: &str) -> Song {
    Song::new(path, Metadata::new().with(Field::Title, title))
}

fn titles(model: &LibraryModel) -> Vec<String> {
    (0..model.row_count())
        .map(|r| model.data(r, 0).unwrap().to_string())
        .collect()
}

/// Mono 16-bit PCM silence.
fn write_wav(path: &Path, secs: u32) {
    let sample_rate: u32 = 8000;
    let data_len = sample_rate * 2 * secs;
    let mut bytes = Vec::with_capacity(44 + data_len as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    bytes.resize(44 + data_len as usize, 0);
    fs::write(path, bytes).unwrap();
}

#[test]
fn is_audio_file_matches_allow_list_case_insensitive() {
    let exts = LibrarySettings::default().extensions;
    assert!(is_audio_file(Path::new("/tmp/a.mp3"), &exts));
    assert!(is_audio_file(Path::new("/tmp/a.MP3"), &exts));
    assert!(is_audio_file(Path::new("/tmp/a.aiff"), &exts));
    assert!(is_audio_file(Path::new("/tmp/a.m4a"), &exts));
    assert!(!is_audio_file(Path::new("/tmp/a.txt"), &exts));
    assert!(!is_audio_file(Path::new("/tmp/a"), &exts));
    assert!(is_audio_file(Path::new("/tmp/a.ogg"), &[".OGG".to_string()]));
}

#[test]
fn listing_keeps_only_allowed_extensions_sorted_by_name() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "b.wav");
    touch(dir.path(), "a.mp3");
    touch(dir.path(), "c.txt");
    touch(dir.path(), "cover.jpg");

    let names: Vec<String> = list_candidates(dir.path(), &LibrarySettings::default())
        .iter()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["a.mp3", "b.wav"]);
}

#[test]
fn listing_is_flat_unless_recursive() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "root.mp3");
    let sub = dir.path().join("sub");
    fs::create_dir_all(&sub).unwrap();
    touch(&sub, "child.mp3");

    let flat = list_candidates(dir.path(), &LibrarySettings::default());
    assert_eq!(flat.len(), 1);

    let settings = LibrarySettings {
        recursive: true,
        ..LibrarySettings::default()
    };
    assert_eq!(list_candidates(dir.path(), &settings).len(), 2);
}

#[test]
fn listing_skips_dotfiles_by_default() {
    let dir = tempdir().unwrap();
    touch(dir.path(), ".hidden.mp3");
    touch(dir.path(), "visible.mp3");

    let entries = list_candidates(dir.path(), &LibrarySettings::default());
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].file_name(), "visible.mp3");

    let settings = LibrarySettings {
        include_hidden: true,
        ..LibrarySettings::default()
    };
    assert_eq!(list_candidates(dir.path(), &settings).len(), 2);
}

#[test]
fn scan_excludes_unsupported_extensions_regardless_of_content() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "a.mp3");
    touch(dir.path(), "b.wav");
    touch(dir.path(), "c.txt");
    // Tags exist for the .txt file too; the extension alone rules it out.
    let tags = FakeTags::with(&[("a.mp3", "Song A"), ("b.wav", "Song B"), ("c.txt", "Text")]);
    let (mut model, _) = model_with(tags, None);

    model.scan_directory(dir.path()).unwrap();
    model.wait_for_scans();

    assert_eq!(titles(&model), ["Song A", "Song B"]);
    assert!(!model.is_scanning());
}

#[test]
fn scan_skips_files_that_fail_to_parse_and_keeps_going() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "a.mp3");
    touch(dir.path(), "broken.mp3");
    touch(dir.path(), "c.flac");
    let tags = FakeTags::with(&[("a.mp3", "A"), ("c.flac", "C")]);
    let (mut model, _) = model_with(tags, None);

    model.scan_directory(dir.path()).unwrap();
    let added = model.wait_for_scans();

    let expected: usize = if cfg!(target_os = "linux") { 2 } else { 1 };
    assert_eq!(added, expected);
    assert!(
        model
            .songs()
            .iter()
            .all(|s| s.path().file_name().unwrap() != "broken.mp3")
    );
}

#[test]
fn rescanning_the_same_directory_adds_nothing_and_stays_quiet() {
    let dir = tempdir().unwrap();
    let dup = touch(dir.path(), "dup.mp3");
    let tags = FakeTags::with(&[("dup.mp3", "Dup")]);
    let (mut model, appended) = model_with(tags, None);
    let events = model.subscribe();

    model.scan_directory(dir.path()).unwrap();
    model.wait_for_scans();
    assert_eq!(
        events.try_iter().collect::<Vec<_>>(),
        [LibraryEvent::RowInserted(0), LibraryEvent::LibraryChanged]
    );

    model.scan_directory(dir.path()).unwrap();
    assert_eq!(model.wait_for_scans(), 0);

    assert_eq!(model.row_count(), 1);
    assert_eq!(*appended.lock().unwrap(), [dup]);
    assert_eq!(events.try_iter().count(), 0);
}

#[test]
fn overlapping_scans_of_one_directory_merge_without_duplicates() {
    let dir = tempdir().unwrap();
    let a = touch(dir.path(), "a.mp3");
    let b = touch(dir.path(), "b.mp3");
    let tags = FakeTags::with(&[("a.mp3", "A"), ("b.mp3", "B")]);
    let (mut model, appended) = model_with(tags, None);
    let events = model.subscribe();

    model.scan_directory(dir.path()).unwrap();
    model.scan_directory(dir.path()).unwrap();
    assert_eq!(model.wait_for_scans(), 2);

    assert!(!model.is_scanning());
    assert_eq!(titles(&model), ["A", "B"]);
    assert_eq!(*appended.lock().unwrap(), [a, b]);
    assert_eq!(
        events.try_iter().collect::<Vec<_>>(),
        [
            LibraryEvent::RowInserted(0),
            LibraryEvent::RowInserted(1),
            LibraryEvent::LibraryChanged,
        ]
    );
}

#[test]
fn cancelled_scan_adds_nothing_to_the_model() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "a.mp3");
    touch(dir.path(), "b.mp3");
    let tags = GatedTags::new(FakeTags::with(&[("a.mp3", "A"), ("b.mp3", "B")]));
    let (mut model, appended) = model_with(tags.clone(), None);
    let events = model.subscribe();

    model.scan_directory(dir.path()).unwrap();
    model.cancel_scans();
    tags.release();

    assert_eq!(model.wait_for_scans(), 0);
    assert!(!model.is_scanning());
    assert_eq!(model.row_count(), 0);
    assert!(appended.lock().unwrap().is_empty());
    assert_eq!(events.try_iter().count(), 0);
}

#[test]
fn update_library_appends_to_queue_in_table_order() {
    let (mut model, appended) = model_with(FakeTags::with(&[]), None);
    let events = model.subscribe();

    let added = model.update_library(vec![
        song("/m/x.mp3", "X"),
        song("/m/y.mp3", "Y"),
        song("/m/x.mp3", "X again"),
        song("/m/z.mp3", "Z"),
    ]);

    assert_eq!(added, 3);
    let paths: Vec<PathBuf> = model.songs().iter().map(|s| s.path().to_path_buf()).collect();
    assert_eq!(*appended.lock().unwrap(), paths);
    assert_eq!(
        events.try_iter().collect::<Vec<_>>(),
        [
            LibraryEvent::RowInserted(0),
            LibraryEvent::RowInserted(1),
            LibraryEvent::RowInserted(2),
            LibraryEvent::LibraryChanged,
        ]
    );
}

#[test]
fn empty_batch_announces_nothing() {
    let (mut model, appended) = model_with(FakeTags::with(&[]), None);
    let events = model.subscribe();

    assert_eq!(model.update_library(Vec::new()), 0);
    assert_eq!(events.try_iter().count(), 0);
    assert!(appended.lock().unwrap().is_empty());
}

#[test]
fn sort_alternates_direction_and_scenario_order_holds() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "a.mp3");
    touch(dir.path(), "b.wav");
    touch(dir.path(), "c.txt");
    let tags = FakeTags::with(&[("a.mp3", "Song A"), ("b.wav", "Song B")]);
    let (mut model, _) = model_with(tags, None);
    model.scan_directory(dir.path()).unwrap();
    model.wait_for_scans();
    let events = model.subscribe();
    assert_eq!(model.last_sort(), None);

    model.sort_by_column(0);
    assert_eq!(titles(&model), ["Song A", "Song B"]);
    assert_eq!(model.sort_order(), SortOrder::Descending);
    assert_eq!(model.last_sort(), Some(SortOrder::Ascending));

    model.sort_by_column(0);
    assert_eq!(titles(&model), ["Song B", "Song A"]);
    assert_eq!(model.sort_order(), SortOrder::Ascending);
    assert_eq!(model.last_sort(), Some(SortOrder::Descending));

    assert_eq!(
        events.try_iter().collect::<Vec<_>>(),
        [LibraryEvent::FullTableChanged, LibraryEvent::FullTableChanged]
    );
}

#[test]
fn sort_twice_keeps_ties_in_original_order() {
    let (mut model, _) = model_with(FakeTags::with(&[]), None);
    let meta = |title: &str, artist: &str| {
        Metadata::new()
            .with(Field::Title, title)
            .with(Field::Artist, artist)
    };
    model.update_library(vec![
        Song::new("/m/1.mp3", meta("one", "B")),
        Song::new("/m/2.mp3", meta("two", "A")),
        Song::new("/m/3.mp3", meta("three", "B")),
        Song::new("/m/4.mp3", meta("four", "A")),
    ]);

    model.sort_by_column(1);
    assert_eq!(titles(&model), ["two", "four", "one", "three"]);
    model.sort_by_column(1);
    assert_eq!(titles(&model), ["one", "three", "two", "four"]);
}

#[test]
fn direction_toggles_across_different_columns() {
    let (mut model, _) = model_with(FakeTags::with(&[]), None);
    model.update_library(vec![
        Song::new(
            "/m/a.mp3",
            Metadata::new().with(Field::Title, "a").with(Field::Album, "z"),
        ),
        Song::new(
            "/m/b.mp3",
            Metadata::new().with(Field::Title, "b").with(Field::Album, "y"),
        ),
    ]);

    model.sort_by_column(0);
    // Second call is descending even though the column changed.
    model.sort_by_column(2);
    assert_eq!(titles(&model), ["a", "b"]);
}

#[test]
fn duration_sorts_as_text() {
    let (mut model, _) = model_with(FakeTags::with(&[]), None);
    model.update_library(vec![
        Song::new("/m/long.mp3", Metadata::new().with(Field::Duration, "10:00")),
        Song::new("/m/short.mp3", Metadata::new().with(Field::Duration, "9:00")),
    ]);
    model.sort_by_column(4);
    assert_eq!(model.data(0, 4), Some("10:00"));
    assert_eq!(model.data(1, 4), Some("9:00"));
}

#[test]
fn sort_on_unknown_column_is_a_no_op() {
    let (mut model, _) = model_with(FakeTags::with(&[]), None);
    model.update_library(vec![song("/m/b.mp3", "b"), song("/m/a.mp3", "a")]);
    let events = model.subscribe();

    model.sort_by_column(5);
    assert_eq!(titles(&model), ["b", "a"]);
    assert_eq!(model.sort_order(), SortOrder::Ascending);
    assert_eq!(model.last_sort(), None);
    assert_eq!(events.try_iter().count(), 0);
}

#[test]
fn update_metadata_on_playing_track_announces_both_events() {
    let tags = FakeTags::with(&[("now.mp3", "Fresh title")]);
    let (mut model, _) = model_with(tags, Some(PathBuf::from("/m/now.mp3")));
    model.update_library(vec![song("/m/now.mp3", "Stale title")]);
    let events = model.subscribe();

    model.index_might_be_updated(0);
    model.update_metadata().unwrap();

    assert_eq!(model.data(0, 0), Some("Fresh title"));
    assert_eq!(
        events.try_iter().collect::<Vec<_>>(),
        [
            LibraryEvent::FullTableChanged,
            LibraryEvent::TrackMetadataChanged
        ]
    );
}

#[test]
fn update_metadata_on_other_track_only_refreshes_table() {
    let tags = FakeTags::with(&[("other.mp3", "Other")]);
    let (mut model, _) = model_with(tags, Some(PathBuf::from("/m/now.mp3")));
    model.update_library(vec![song("/m/other.mp3", "Other")]);
    let events = model.subscribe();

    model.index_might_be_updated(0);
    model.update_metadata().unwrap();

    assert_eq!(
        events.try_iter().collect::<Vec<_>>(),
        [LibraryEvent::FullTableChanged]
    );
}

#[test]
fn update_metadata_keeps_old_tags_when_file_is_unreadable() {
    let (mut model, _) = model_with(FakeTags::with(&[]), None);
    model.update_library(vec![song("/m/gone.mp3", "Still here")]);

    model.index_might_be_updated(0);
    model.update_metadata().unwrap();
    assert_eq!(model.data(0, 0), Some("Still here"));
}

#[test]
fn update_metadata_requires_a_marked_row() {
    let (mut model, _) = model_with(FakeTags::with(&[]), None);
    model.update_library(vec![song("/m/a.mp3", "A")]);
    let events = model.subscribe();

    assert!(matches!(
        model.update_metadata(),
        Err(LibraryError::NoPendingEdit)
    ));

    model.index_might_be_updated(3);
    assert!(matches!(
        model.update_metadata(),
        Err(LibraryError::RowOutOfRange { row: 3, len: 1 })
    ));
    assert_eq!(events.try_iter().count(), 0);
    // A failed commit leaves the mark in place.
    assert_eq!(model.marked_row(), Some(3));
}

#[test]
fn supported_formats_follow_settings() {
    let (model, _) = model_with(FakeTags::with(&[]), None);
    assert!(model.supported_formats().iter().any(|e| e == "wav"));

    let settings = LibrarySettings {
        extensions: vec!["opus".to_string()],
        ..LibrarySettings::default()
    };
    let model = LibraryModel::new(
        settings,
        FakeTags::with(&[]),
        Box::new(RecordingQueue(Arc::default())),
        Box::new(FixedNowPlaying(None)),
    );
    assert_eq!(model.supported_formats(), ["opus".to_string()]);
}

#[test]
fn accessors_return_none_out_of_range() {
    let (mut model, _) = model_with(FakeTags::with(&[]), None);
    assert_eq!(model.data(0, 0), None);

    model.update_library(vec![song("/m/a.mp3", "A")]);
    assert_eq!(model.row_count(), 1);
    assert_eq!(model.column_count(), 5);
    assert_eq!(model.header_data(0), Some("Title"));
    assert_eq!(model.header_data(4), Some("Duration"));
    assert_eq!(model.header_data(5), None);
    assert_eq!(model.data(0, 0), Some("A"));
    assert_eq!(model.data(0, 3), Some(""));
    assert_eq!(model.data(0, 5), None);
    assert_eq!(model.data(1, 0), None);
    assert_eq!(model.get(0), Some(PathBuf::from("/m/a.mp3")));
    assert_eq!(model.get(1), None);
}

#[test]
fn scan_directory_rejects_non_directories() {
    let dir = tempdir().unwrap();
    let file = touch(dir.path(), "a.mp3");
    let (mut model, _) = model_with(FakeTags::with(&[]), None);

    assert!(matches!(
        model.scan_directory(&file),
        Err(LibraryError::NotADirectory(_))
    ));
    assert!(matches!(
        model.scan_directory(&dir.path().join("missing")),
        Err(LibraryError::NotADirectory(_))
    ));
}

#[test]
fn cancelled_scanner_produces_no_batch() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "a.mp3");
    let entries = list_candidates(dir.path(), &LibrarySettings::default());
    let scanner = MusicScanner::new(ScanId(7), entries, FakeTags::with(&[("a.mp3", "A")]));

    assert_eq!(scanner.scan().map(|s| s.len()), Some(1));
    scanner.cancel_flag().store(true, Ordering::Relaxed);
    assert!(scanner.scan().is_none());
}

#[test]
fn scanner_thread_reports_batch_then_finished() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "a.mp3");
    let entries = list_candidates(dir.path(), &LibrarySettings::default());
    let scanner = MusicScanner::new(ScanId(1), entries, FakeTags::with(&[("a.mp3", "A")]));
    let (tx, rx) = std::sync::mpsc::channel();

    scanner.start(tx).unwrap().join().unwrap();

    let msgs: Vec<ScanMessage> = rx.try_iter().collect();
    assert_eq!(msgs.len(), 2);
    assert!(matches!(&msgs[0], ScanMessage::Batch { id: ScanId(1), songs } if songs.len() == 1));
    assert!(matches!(msgs[1], ScanMessage::Finished { id: ScanId(1) }));
}

#[test]
fn lofty_reader_reads_wav_and_rejects_garbage() {
    let dir = tempdir().unwrap();
    let wav = dir.path().join("Quiet Track.wav");
    write_wav(&wav, 1);
    let junk = touch(dir.path(), "junk.mp3");

    let metadata = LoftyTagReader.read(&wav).unwrap();
    assert_eq!(metadata.value(Field::Title), "Quiet Track");
    assert_eq!(metadata.value(Field::Duration), "0:01");
    assert_eq!(metadata.get(Field::Artist), None);

    assert!(LoftyTagReader.read(&junk).is_err());
}

#[test]
fn real_scan_with_lofty_keeps_only_parseable_files() {
    let dir = tempdir().unwrap();
    write_wav(&dir.path().join("tone.wav"), 2);
    touch(dir.path(), "fake.mp3");
    touch(dir.path(), "notes.txt");

    let (mut model, appended) = model_with(Arc::new(LoftyTagReader), None);
    model.scan_directory(dir.path()).unwrap();
    model.wait_for_scans();

    assert_eq!(model.row_count(), 1);
    assert_eq!(model.data(0, 0), Some("tone"));
    assert_eq!(model.data(0, 4), Some("0:02"));
    assert_eq!(appended.lock().unwrap().len(), 1);
}
