use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::seq::SliceRandom;

use crate::config::LoopModeSetting;
use crate::library::{MediaQueue, NowPlaying};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum LoopMode {
    /// Stop after the last item.
    #[default]
    NoLoop,
    /// Wrap around to the first item.
    LoopAll,
    /// Repeat the current item when it ends.
    LoopOne,
}

impl From<LoopModeSetting> for LoopMode {
    fn from(setting: LoopModeSetting) -> Self {
        match setting {
            LoopModeSetting::NoLoop => LoopMode::NoLoop,
            LoopModeSetting::LoopAll => LoopMode::LoopAll,
            LoopModeSetting::LoopOne => LoopMode::LoopOne,
        }
    }
}

/// Ordered list of playable files plus the position of the current one.
#[derive(Debug, Default)]
pub struct Playlist {
    media: Vec<PathBuf>,
    current: Option<usize>,
    loop_mode: LoopMode,
    shuffle: bool,
}

pub type PlaylistHandle = Arc<Mutex<Playlist>>;

/// Lock a shared playlist, recovering the data if a holder panicked.
pub fn lock(handle: &PlaylistHandle) -> MutexGuard<'_, Playlist> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_handle(self) -> PlaylistHandle {
        Arc::new(Mutex::new(self))
    }

    pub fn add_media(&mut self, locator: impl Into<PathBuf>) {
        self.media.push(locator.into());
    }

    /// Insert at `index` (clamped to the end). The current item keeps
    /// pointing at the same file.
    pub fn insert_media(&mut self, index: usize, locator: impl Into<PathBuf>) {
        let index = index.min(self.media.len());
        self.media.insert(index, locator.into());
        if let Some(cur) = self.current {
            if cur >= index {
                self.current = Some(cur + 1);
            }
        }
    }

    pub fn media(&self, index: usize) -> Option<&Path> {
        self.media.get(index).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.media.len()
    }

    pub fn is_empty(&self) -> bool {
        self.media.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_media(&self) -> Option<&Path> {
        self.current.and_then(|i| self.media(i))
    }

    /// Returns false (and changes nothing) for an index past the end.
    pub fn set_current_index(&mut self, index: usize) -> bool {
        if index < self.media.len() {
            self.current = Some(index);
            true
        } else {
            false
        }
    }

    /// Move to the next item.
    ///
    /// Starts at the first item when nothing is current. Past the last item
    /// it wraps in `LoopAll`; otherwise the current item is cleared and
    /// `None` returned. With shuffle on, any other item may come next.
    pub fn next(&mut self) -> Option<usize> {
        if self.media.is_empty() {
            self.current = None;
            return None;
        }

        if self.shuffle {
            if let Some(i) = self.random_other() {
                self.current = Some(i);
                return self.current;
            }
        }

        let next = self.current.map_or(0, |i| i + 1);
        self.current = if next < self.media.len() {
            Some(next)
        } else if self.loop_mode == LoopMode::LoopAll {
            Some(0)
        } else {
            None
        };
        self.current
    }

    /// Move to the previous item. At the first item this wraps only in
    /// `LoopAll`; otherwise nothing changes and `None` is returned.
    pub fn previous(&mut self) -> Option<usize> {
        match self.current {
            None => None,
            Some(0) if self.loop_mode == LoopMode::LoopAll => {
                self.current = Some(self.media.len() - 1);
                self.current
            }
            Some(0) => None,
            Some(i) => {
                self.current = Some(i - 1);
                self.current
            }
        }
    }

    /// Pick what plays after the current item ends on its own.
    pub fn advance_on_finish(&mut self) -> Option<usize> {
        match (self.loop_mode, self.current) {
            (LoopMode::LoopOne, Some(i)) => Some(i),
            _ => self.next(),
        }
    }

    fn random_other(&self) -> Option<usize> {
        let mut candidates: Vec<usize> = (0..self.media.len())
            .filter(|&i| Some(i) != self.current)
            .collect();
        candidates.shuffle(&mut rand::rng());
        candidates.first().copied()
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    pub fn set_loop_mode(&mut self, mode: LoopMode) {
        self.loop_mode = mode;
    }

    /// Cycle `NoLoop -> LoopAll -> LoopOne -> NoLoop`.
    pub fn cycle_loop_mode(&mut self) -> LoopMode {
        self.loop_mode = match self.loop_mode {
            LoopMode::NoLoop => LoopMode::LoopAll,
            LoopMode::LoopAll => LoopMode::LoopOne,
            LoopMode::LoopOne => LoopMode::NoLoop,
        };
        self.loop_mode
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    pub fn set_shuffle(&mut self, on: bool) {
        self.shuffle = on;
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        self.shuffle = !self.shuffle;
        self.shuffle
    }
}

impl MediaQueue for PlaylistHandle {
    fn add_media(&mut self, locator: &Path) {
        lock(self).add_media(locator);
    }
}

impl NowPlaying for PlaylistHandle {
    fn current_media(&self) -> Option<PathBuf> {
        lock(self).current_media().map(Path::to_path_buf)
    }
}
