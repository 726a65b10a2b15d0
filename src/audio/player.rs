use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use super::thread::spawn_audio_thread;
use super::types::{PlaybackHandle, PlaybackInfo, PlayerCmd, PlayerEvent};

pub struct AudioPlayer {
    tx: Sender<PlayerCmd>,
    events: Receiver<PlayerEvent>,
    playback: PlaybackHandle,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl AudioPlayer {
    pub fn new(volume: u8) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel::<PlayerCmd>();
        let (event_tx, events) = mpsc::channel::<PlayerEvent>();
        let playback_info: PlaybackHandle = Arc::new(Mutex::new(PlaybackInfo {
            volume,
            ..PlaybackInfo::default()
        }));

        let audio_handle = spawn_audio_thread(rx, event_tx, playback_info.clone(), volume)?;

        Ok(Self {
            tx,
            events,
            playback: playback_info,
            join: Mutex::new(Some(audio_handle)),
        })
    }

    /// Snapshot of the shared playback info.
    pub fn info(&self) -> PlaybackInfo {
        self.playback
            .lock()
            .map(|info| info.clone())
            .unwrap_or_default()
    }

    pub fn send(&self, cmd: PlayerCmd) -> Result<(), mpsc::SendError<PlayerCmd>> {
        self.tx.send(cmd)
    }

    /// Next pending engine event, if any. Never blocks.
    pub fn try_event(&self) -> Option<PlayerEvent> {
        self.events.try_recv().ok()
    }

    pub fn quit_softly(&self, fade_out: Duration) {
        let _ = self.send(PlayerCmd::Quit {
            fade_out_ms: fade_out.as_millis() as u64,
        });

        if let Ok(mut j) = self.join.lock() {
            if let Some(h) = j.take() {
                let _ = h.join();
            }
        }
    }
}
