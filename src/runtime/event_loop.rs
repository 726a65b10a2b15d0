use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::SetTitle;
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{debug, warn};

use crate::app::{App, InputMode};
use crate::audio::{AudioPlayer, PlayerCmd, PlayerEvent};
use crate::config;
use crate::ui;

/// State tracked by the event loop across iterations.
#[derive(Default)]
struct EventLoopState {
    /// First `g` of a `gg` was pressed.
    pending_gg: bool,
    /// Last title written to the terminal.
    last_title: Option<String>,
}

/// Main terminal event loop: input, drawing, and syncing with the library
/// scans and the audio thread. Returns `Ok(())` when quit is requested.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    app: &mut App,
    audio_player: &AudioPlayer,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut state = EventLoopState::default();

    loop {
        app.tick();

        while let Some(ev) = audio_player.try_event() {
            handle_player_event(ev, app, audio_player);
        }
        app.sync_playback(&audio_player.info());

        if settings.ui.set_terminal_title {
            let title = ui::terminal_title(app);
            if state.last_title.as_deref() != Some(title.as_str()) {
                execute!(terminal.backend_mut(), SetTitle(&title))?;
                state.last_title = Some(title);
            }
        }

        terminal.draw(|f| ui::draw(f, app, settings))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key_event(key, settings, app, audio_player, &mut state) {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn send(audio_player: &AudioPlayer, cmd: Option<PlayerCmd>) {
    if let Some(cmd) = cmd {
        if audio_player.send(cmd).is_err() {
            warn!("audio thread is gone");
        }
    }
}

fn handle_player_event(ev: PlayerEvent, app: &mut App, audio_player: &AudioPlayer) {
    debug!(?ev, "player event");
    match ev {
        PlayerEvent::TrackEnded(path) => {
            let cmd = app.track_finished(&path);
            send(audio_player, Some(cmd));
        }
        PlayerEvent::Failed { reason, .. } => app.playback_failed(&reason),
    }
}

/// Returns true when the app should quit.
fn handle_key_event(
    key: KeyEvent,
    settings: &config::Settings,
    app: &mut App,
    audio_player: &AudioPlayer,
    state: &mut EventLoopState,
) -> bool {
    if app.input_mode == InputMode::OpenDirectory {
        match key.code {
            KeyCode::Esc => app.cancel_input(),
            KeyCode::Enter => app.submit_input(),
            KeyCode::Backspace => app.pop_input_char(),
            KeyCode::Char(c) if !c.is_control() => app.push_input_char(c),
            _ => {}
        }
        return false;
    }

    if key.code != KeyCode::Char('g') {
        state.pending_gg = false;
    }

    match key.code {
        KeyCode::Char('q') => {
            audio_player.quit_softly(Duration::from_millis(settings.audio.quit_fade_out_ms));
            return true;
        }
        KeyCode::Char('j') | KeyCode::Down => app.next(),
        KeyCode::Char('k') | KeyCode::Up => app.prev(),
        KeyCode::Char('g') => {
            if state.pending_gg {
                state.pending_gg = false;
                app.select_first();
            } else {
                state.pending_gg = true;
            }
        }
        KeyCode::Char('G') => app.select_last(),
        KeyCode::Enter => {
            let cmd = app.play_now();
            send(audio_player, cmd);
        }
        KeyCode::Char('p') | KeyCode::Char(' ') => {
            let cmd = app.play_pause();
            send(audio_player, cmd);
        }
        KeyCode::Char('l') => {
            let cmd = app.next_song();
            send(audio_player, cmd);
        }
        KeyCode::Char('h') => {
            let elapsed = audio_player.info().elapsed;
            let cmd = app.previous_song(elapsed);
            send(audio_player, cmd);
        }
        KeyCode::Char('L') => {
            let secs = settings.controls.scrub_seconds.min(i64::MAX as u64) as i64;
            let cmd = app.seek_by(secs);
            send(audio_player, cmd);
        }
        KeyCode::Char('H') => {
            let secs = settings.controls.scrub_seconds.min(i64::MAX as u64) as i64;
            let cmd = app.seek_by(-secs);
            send(audio_player, cmd);
        }
        KeyCode::Char(c @ '1'..='5') => {
            let column = c as usize - '1' as usize;
            app.sort_by_column(column);
        }
        KeyCode::Char('o') => app.begin_open_directory(),
        KeyCode::Char('e') => app.mark_selected_for_update(),
        KeyCode::Char('u') => app.commit_metadata_update(),
        KeyCode::Char('s') => {
            let on = app.toggle_shuffle();
            app.status = Some(format!("Shuffle {}", if on { "on" } else { "off" }));
        }
        KeyCode::Char('r') => {
            let mode = app.cycle_loop_mode();
            app.status = Some(format!("Loop mode: {mode:?}"));
        }
        KeyCode::Char('+') | KeyCode::Char('=') => {
            let cmd = app.volume_up();
            send(audio_player, Some(cmd));
        }
        KeyCode::Char('-') => {
            let cmd = app.volume_down();
            send(audio_player, Some(cmd));
        }
        KeyCode::Char('m') => {
            let cmd = app.toggle_mute();
            send(audio_player, Some(cmd));
        }
        _ => {}
    }

    false
}
