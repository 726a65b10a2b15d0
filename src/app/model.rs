//! Application model: `App` and its input mode.
//!
//! `App` owns the library and shares the playlist with it. Transport
//! operations do not talk to the audio thread themselves; they update the
//! model and return the [`PlayerCmd`] the caller should send.

use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::time::Duration;

use tracing::{debug, warn};

use crate::audio::{PlaybackInfo, PlayerCmd, PlayerState};
use crate::config::PlaybackSettings;
use crate::library::{Field, LibraryEvent, LibraryModel};
use crate::playlist::{LoopMode, PlaylistHandle, lock};

const VOLUME_STEP: u8 = 5;

/// What key presses currently feed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    /// Typing a directory path to scan.
    OpenDirectory,
}

/// Display data for the track loaded in the player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NowPlayingInfo {
    pub path: PathBuf,
    pub title: String,
    pub artist: String,
    pub duration: String,
}

/// The main application model.
pub struct App {
    pub library: LibraryModel,
    pub playlist: PlaylistHandle,
    pub selected: usize,
    pub playback: PlayerState,
    pub elapsed: Duration,
    pub now_playing: Option<NowPlayingInfo>,

    pub input_mode: InputMode,
    pub input: String,
    pub status: Option<String>,
    pub current_dir: Option<PathBuf>,

    pub volume: u8,
    pub muted: bool,

    previous_threshold: Duration,
    events: Receiver<LibraryEvent>,
}

impl App {
    /// Create an `App` over `library`, whose queue collaborator must be
    /// `playlist`.
    pub fn new(
        mut library: LibraryModel,
        playlist: PlaylistHandle,
        settings: &PlaybackSettings,
    ) -> Self {
        let events = library.subscribe();
        {
            let mut pl = lock(&playlist);
            pl.set_loop_mode(LoopMode::from(settings.loop_mode));
            pl.set_shuffle(settings.shuffle);
        }

        Self {
            library,
            playlist,
            selected: 0,
            playback: PlayerState::Stopped,
            elapsed: Duration::ZERO,
            now_playing: None,
            input_mode: InputMode::Normal,
            input: String::new(),
            status: None,
            current_dir: None,
            volume: settings.volume.min(100),
            muted: false,
            previous_threshold: Duration::from_millis(settings.previous_threshold_ms),
            events,
        }
    }

    pub fn has_songs(&self) -> bool {
        self.library.row_count() > 0
    }

    // ---- library ----

    /// Start scanning `dir` in the background.
    pub fn open_directory(&mut self, dir: PathBuf) {
        match self.library.scan_directory(&dir) {
            Ok(_) => {
                self.status = Some(format!("Scanning {}…", dir.display()));
                self.current_dir = Some(dir);
            }
            Err(e) => {
                warn!(error = %e, "scan not started");
                self.status = Some(e.to_string());
            }
        }
    }

    /// Merge finished scans and react to library events. Call once per frame.
    pub fn tick(&mut self) {
        self.library.poll_scans();
        self.process_library_events();
    }

    /// Drain pending library events. Returns true if any arrived.
    pub fn process_library_events(&mut self) -> bool {
        let events: Vec<LibraryEvent> = self.events.try_iter().collect();
        for event in &events {
            match event {
                LibraryEvent::RowInserted(_) => {}
                LibraryEvent::LibraryChanged => {
                    self.status = Some(format!("Library: {} songs", self.library.row_count()));
                }
                LibraryEvent::FullTableChanged => self.clamp_selection(),
                LibraryEvent::TrackMetadataChanged => self.refresh_now_playing(),
            }
        }
        !events.is_empty()
    }

    /// Sort by `column`, keeping the cursor on the same song.
    pub fn sort_by_column(&mut self, column: usize) {
        let selected_path = self.library.get(self.selected);
        self.library.sort_by_column(column);
        self.process_library_events();
        if let Some(row) = selected_path.and_then(|p| self.library.position_of(&p)) {
            self.selected = row;
        }
    }

    /// Remember the selected row as the one about to be edited elsewhere.
    pub fn mark_selected_for_update(&mut self) {
        if !self.has_songs() {
            return;
        }
        self.library.index_might_be_updated(self.selected);
        self.status = Some(format!(
            "Marked row {} for a metadata refresh (u to apply)",
            self.selected + 1
        ));
    }

    /// Re-read the tags of the marked row.
    pub fn commit_metadata_update(&mut self) {
        match self.library.update_metadata() {
            Ok(()) => self.status = Some("Metadata refreshed".to_string()),
            Err(e) => self.status = Some(e.to_string()),
        }
        self.process_library_events();
    }

    // ---- transport ----

    /// Start or resume playback of the playlist.
    pub fn play(&mut self) -> Option<PlayerCmd> {
        match self.playback {
            PlayerState::Playing => None,
            PlayerState::Paused => {
                self.playback = PlayerState::Playing;
                Some(PlayerCmd::Resume)
            }
            PlayerState::Stopped => {
                let path = {
                    let mut pl = lock(&self.playlist);
                    if pl.is_empty() {
                        return None;
                    }
                    if pl.current_index().is_none() {
                        pl.set_current_index(0);
                    }
                    pl.current_media().map(Path::to_path_buf)
                }?;
                Some(self.start(path))
            }
        }
    }

    pub fn play_pause(&mut self) -> Option<PlayerCmd> {
        if self.playback == PlayerState::Playing {
            self.playback = PlayerState::Paused;
            Some(PlayerCmd::Pause)
        } else {
            self.play()
        }
    }

    /// Put the selected song at the front of the playlist and play it.
    pub fn play_now(&mut self) -> Option<PlayerCmd> {
        let path = self.library.get(self.selected)?;
        {
            let mut pl = lock(&self.playlist);
            pl.insert_media(0, path.clone());
            pl.set_current_index(0);
        }
        Some(self.start(path))
    }

    pub fn next_song(&mut self) -> Option<PlayerCmd> {
        let target = {
            let mut pl = lock(&self.playlist);
            if pl.is_empty() {
                return None;
            }
            pl.next().and_then(|i| pl.media(i).map(Path::to_path_buf))
        };
        Some(match target {
            Some(path) => self.start(path),
            None => self.stop(),
        })
    }

    /// Go to the previous song, unless more than the configured threshold of
    /// the current one has played; then start the current song over.
    pub fn previous_song(&mut self, elapsed: Duration) -> Option<PlayerCmd> {
        let target = {
            let mut pl = lock(&self.playlist);
            if elapsed < self.previous_threshold && pl.current_index().is_some_and(|i| i > 0) {
                pl.previous().and_then(|i| pl.media(i).map(Path::to_path_buf))
            } else {
                None
            }
        };
        match target {
            Some(path) => Some(self.start(path)),
            None => {
                self.elapsed = Duration::ZERO;
                Some(PlayerCmd::Rewind)
            }
        }
    }

    /// Move the play position by `delta_secs`, never before the start.
    /// Nothing happens while stopped.
    pub fn seek_by(&mut self, delta_secs: i64) -> Option<PlayerCmd> {
        if self.playback == PlayerState::Stopped || self.now_playing.is_none() {
            return None;
        }
        let target = self.elapsed.as_secs().saturating_add_signed(delta_secs);
        self.elapsed = Duration::from_secs(target);
        Some(PlayerCmd::Seek(self.elapsed))
    }

    /// The engine reported that `path` played to its end.
    pub fn track_finished(&mut self, path: &Path) -> PlayerCmd {
        debug!(path = %path.display(), "track finished");
        let target = {
            let mut pl = lock(&self.playlist);
            pl.advance_on_finish()
                .and_then(|i| pl.media(i).map(Path::to_path_buf))
        };
        match target {
            Some(path) => self.start(path),
            None => self.stop(),
        }
    }

    /// The engine could not play a file.
    pub fn playback_failed(&mut self, reason: &str) {
        self.playback = PlayerState::Stopped;
        self.status = Some(reason.to_string());
    }

    pub fn stop(&mut self) -> PlayerCmd {
        self.playback = PlayerState::Stopped;
        self.elapsed = Duration::ZERO;
        self.now_playing = None;
        PlayerCmd::Stop
    }

    fn start(&mut self, path: PathBuf) -> PlayerCmd {
        self.playback = PlayerState::Playing;
        self.elapsed = Duration::ZERO;
        self.now_playing = Some(self.describe(&path));
        PlayerCmd::Play(path)
    }

    /// Copy engine progress into the model, once the engine has caught up
    /// with the track this model expects.
    pub fn sync_playback(&mut self, info: &PlaybackInfo) {
        let expected = self.now_playing.as_ref().map(|n| n.path.as_path());
        if info.path.as_deref() == expected {
            self.playback = info.state;
            self.elapsed = info.elapsed;
        }
    }

    pub fn volume_up(&mut self) -> PlayerCmd {
        self.volume = self.volume.saturating_add(VOLUME_STEP).min(100);
        PlayerCmd::SetVolume(self.volume)
    }

    pub fn volume_down(&mut self) -> PlayerCmd {
        self.volume = self.volume.saturating_sub(VOLUME_STEP);
        PlayerCmd::SetVolume(self.volume)
    }

    pub fn toggle_mute(&mut self) -> PlayerCmd {
        self.muted = !self.muted;
        PlayerCmd::SetMuted(self.muted)
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        lock(&self.playlist).toggle_shuffle()
    }

    pub fn cycle_loop_mode(&mut self) -> LoopMode {
        lock(&self.playlist).cycle_loop_mode()
    }

    // ---- now playing ----

    fn describe(&self, path: &Path) -> NowPlayingInfo {
        let song = self
            .library
            .position_of(path)
            .and_then(|row| self.library.song_at(row));
        let fallback_title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("UNKNOWN")
            .to_string();

        match song {
            Some(song) => NowPlayingInfo {
                path: path.to_path_buf(),
                title: song
                    .metadata()
                    .get(Field::Title)
                    .map(str::to_string)
                    .unwrap_or(fallback_title),
                artist: song.artist().to_string(),
                duration: song.metadata().value(Field::Duration).to_string(),
            },
            None => NowPlayingInfo {
                path: path.to_path_buf(),
                title: fallback_title,
                artist: String::new(),
                duration: String::new(),
            },
        }
    }

    fn refresh_now_playing(&mut self) {
        if let Some(path) = self.now_playing.as_ref().map(|n| n.path.clone()) {
            self.now_playing = Some(self.describe(&path));
        }
    }

    /// `"artist - title"` of the current track, for the terminal title.
    pub fn window_title(&self) -> Option<String> {
        let np = self.now_playing.as_ref()?;
        let artist = np.artist.trim();
        Some(if artist.is_empty() {
            np.title.clone()
        } else {
            format!("{} - {}", artist, np.title)
        })
    }

    // ---- selection ----

    /// Move selection to the next row, wrapping to the first.
    pub fn next(&mut self) {
        let rows = self.library.row_count();
        if rows > 0 {
            self.selected = (self.selected + 1) % rows;
        }
    }

    /// Move selection to the previous row, wrapping to the last.
    pub fn prev(&mut self) {
        let rows = self.library.row_count();
        if rows > 0 {
            self.selected = (self.selected + rows - 1) % rows;
        }
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.library.row_count().saturating_sub(1);
    }

    fn clamp_selection(&mut self) {
        let rows = self.library.row_count();
        if self.selected >= rows {
            self.selected = rows.saturating_sub(1);
        }
    }

    // ---- directory prompt ----

    pub fn begin_open_directory(&mut self) {
        self.input_mode = InputMode::OpenDirectory;
        self.input = self
            .current_dir
            .as_ref()
            .map(|d| d.display().to_string())
            .unwrap_or_default();
    }

    pub fn push_input_char(&mut self, c: char) {
        self.input.push(c);
    }

    pub fn pop_input_char(&mut self) {
        self.input.pop();
    }

    pub fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input.clear();
    }

    /// Scan the typed directory. An empty prompt just closes it.
    pub fn submit_input(&mut self) {
        let typed = self.input.trim().to_string();
        self.cancel_input();
        if !typed.is_empty() {
            self.open_directory(PathBuf::from(typed));
        }
    }
}
