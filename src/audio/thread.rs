use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rodio::{OutputStream, OutputStreamBuilder, Sink};
use tracing::{debug, error, warn};

use crate::error::PlayerError;

use super::sink::create_sink;
use super::types::{PlaybackHandle, PlayerCmd, PlayerEvent, PlayerState, effective_volume};

const TICK: Duration = Duration::from_millis(200);

pub(super) fn spawn_audio_thread(
    rx: Receiver<PlayerCmd>,
    events: Sender<PlayerEvent>,
    playback_info: PlaybackHandle,
    volume: u8,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("audio".to_string())
        .spawn(move || {
            let mut stream = match OutputStreamBuilder::open_default_stream() {
                Ok(s) => s,
                Err(e) => {
                    let err = PlayerError::Output(e.to_string());
                    error!(error = %err, "audio thread has no output");
                    let _ = events.send(PlayerEvent::Failed {
                        path: None,
                        reason: err.to_string(),
                    });
                    // Keep accepting commands so senders never block on a dead channel.
                    while let Ok(cmd) = rx.recv() {
                        if let PlayerCmd::Quit { .. } = cmd {
                            break;
                        }
                    }
                    return;
                }
            };
            // rodio logs to stderr when OutputStream is dropped, which would
            // scribble over the terminal UI.
            stream.log_on_drop(false);

            let mut engine = Engine {
                stream,
                sink: None,
                offset: Duration::ZERO,
                path: None,
                state: PlayerState::Stopped,
                volume,
                muted: false,
                playback_info,
                events,
            };
            engine.publish();

            loop {
                match rx.recv_timeout(TICK) {
                    Ok(PlayerCmd::Quit { fade_out_ms }) => {
                        engine.quit(fade_out_ms);
                        break;
                    }
                    Ok(cmd) => engine.handle(cmd),
                    Err(RecvTimeoutError::Timeout) => engine.tick(),
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        })
}

struct Engine {
    stream: OutputStream,
    sink: Option<Sink>,
    /// Position the current sink started at when it was opened mid-file.
    offset: Duration,
    path: Option<PathBuf>,
    state: PlayerState,
    volume: u8,
    muted: bool,
    playback_info: PlaybackHandle,
    events: Sender<PlayerEvent>,
}

impl Engine {
    fn handle(&mut self, cmd: PlayerCmd) {
        debug!(?cmd, "audio command");
        match cmd {
            PlayerCmd::Play(path) => self.play(path),
            PlayerCmd::Pause => self.pause(),
            PlayerCmd::Resume => self.resume(),
            PlayerCmd::Stop => self.stop(),
            PlayerCmd::Rewind => self.seek(Duration::ZERO),
            PlayerCmd::Seek(pos) => self.seek(pos),
            PlayerCmd::SetVolume(v) => {
                self.volume = v.min(100);
                self.apply_volume();
            }
            PlayerCmd::SetMuted(m) => {
                self.muted = m;
                self.apply_volume();
            }
            PlayerCmd::Quit { fade_out_ms } => self.quit(fade_out_ms),
        }
        self.publish();
    }

    fn play(&mut self, path: PathBuf) {
        self.play_from(path, Duration::ZERO);
    }

    fn play_from(&mut self, path: PathBuf, start: Duration) {
        if let Some(old) = self.sink.take() {
            old.stop();
        }

        match create_sink(&self.stream, &path, start) {
            Ok(sink) => {
                sink.set_volume(effective_volume(self.volume, self.muted));
                sink.play();
                self.sink = Some(sink);
                self.offset = start;
                self.path = Some(path);
                self.state = PlayerState::Playing;
            }
            Err(e) => {
                warn!(error = %e, "cannot play file");
                self.path = None;
                self.state = PlayerState::Stopped;
                let _ = self.events.send(PlayerEvent::Failed {
                    path: Some(path),
                    reason: e.to_string(),
                });
            }
        }
    }

    fn pause(&mut self) {
        if let (Some(s), PlayerState::Playing) = (&self.sink, self.state) {
            s.pause();
            self.state = PlayerState::Paused;
        }
    }

    fn resume(&mut self) {
        if let (Some(s), PlayerState::Paused) = (&self.sink, self.state) {
            s.play();
            self.state = PlayerState::Playing;
        }
    }

    fn stop(&mut self) {
        if let Some(s) = self.sink.take() {
            s.stop();
        }
        self.path = None;
        self.offset = Duration::ZERO;
        self.state = PlayerState::Stopped;
    }

    fn seek(&mut self, pos: Duration) {
        let Some(sink) = &self.sink else {
            return;
        };
        match sink.try_seek(pos) {
            Ok(()) => self.offset = Duration::ZERO,
            Err(e) => {
                // Some decoders cannot seek; reopen the file and skip ahead instead.
                debug!(error = %e, "seek failed, reloading");
                let was_paused = self.state == PlayerState::Paused;
                if let Some(path) = self.path.clone() {
                    self.play_from(path, pos);
                    if was_paused {
                        self.pause();
                    }
                }
            }
        }
    }

    fn apply_volume(&self) {
        if let Some(s) = &self.sink {
            s.set_volume(effective_volume(self.volume, self.muted));
        }
    }

    fn tick(&mut self) {
        let ended = self.state == PlayerState::Playing
            && self.sink.as_ref().is_some_and(|s| s.empty());
        if ended {
            self.sink = None;
            self.state = PlayerState::Stopped;
            if let Some(path) = self.path.take() {
                let _ = self.events.send(PlayerEvent::TrackEnded(path));
            }
        }
        self.publish();
    }

    fn quit(&mut self, fade_out_ms: u64) {
        if let Some(s) = &self.sink {
            if self.state == PlayerState::Playing {
                fade_out_sink(s, effective_volume(self.volume, self.muted), fade_out_ms);
            }
            s.stop();
        }
        self.sink = None;
        self.path = None;
        self.state = PlayerState::Stopped;
        self.publish();
    }

    fn publish(&self) {
        if let Ok(mut info) = self.playback_info.lock() {
            info.path = self.path.clone();
            info.state = self.state;
            info.elapsed = self
                .sink
                .as_ref()
                .map_or(Duration::ZERO, |s| self.offset + s.get_pos());
            info.volume = self.volume;
            info.muted = self.muted;
        }
    }
}

fn fade_out_sink(sink: &Sink, from: f32, fade_out_ms: u64) {
    if fade_out_ms == 0 {
        sink.set_volume(0.0);
        return;
    }
    let steps: u64 = 20;
    let step_ms = (fade_out_ms / steps).max(1);
    for step in 1..=steps {
        let t = step as f32 / steps as f32;
        sink.set_volume(from * (1.0 - t));
        thread::sleep(Duration::from_millis(step_ms));
    }
    sink.set_volume(0.0);
}
