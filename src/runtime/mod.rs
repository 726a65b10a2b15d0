use std::env;
use std::sync::Arc;

use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, SetTitle, disable_raw_mode, enable_raw_mode,
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{info, warn};

use crate::app::App;
use crate::audio::AudioPlayer;
use crate::library::{LibraryModel, LoftyTagReader};
use crate::playlist::Playlist;

mod event_loop;
mod logging;
mod settings;
mod startup;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = settings::load_settings();
    if let Err(e) = logging::init(&settings.logging) {
        eprintln!("astoria: logging disabled: {e}");
    }

    let playlist = Playlist::new().into_handle();
    let library = LibraryModel::new(
        settings.library.clone(),
        Arc::new(LoftyTagReader),
        Box::new(playlist.clone()),
        Box::new(playlist.clone()),
    );
    let mut app = App::new(library, playlist, &settings.playback);
    let audio_player = AudioPlayer::new(app.volume)?;

    match startup::startup_directory(env::args().nth(1), &settings) {
        Some(dir) => {
            info!(dir = %dir.display(), "initial scan");
            app.open_directory(dir);
        }
        None => warn!("no directory to scan at startup"),
    }

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result = event_loop::run(&mut terminal, &settings, &mut app, &audio_player);

    app.library.cancel_scans();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    if settings.ui.set_terminal_title {
        execute!(terminal.backend_mut(), SetTitle(""))?;
    }
    terminal.show_cursor()?;

    run_result
}
