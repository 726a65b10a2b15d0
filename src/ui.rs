//! UI rendering for the terminal user interface.
//!
//! Draws the library table, the now-playing panel, the status/prompt line and
//! the controls footer using `ratatui`.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Modifier, Style, Stylize},
    text::Line,
    widgets::{Block, Borders, Cell, Padding, Paragraph, Row, Table, TableState, Wrap},
};

use crate::app::{App, InputMode};
use crate::audio::PlayerState;
use crate::config::Settings;
use crate::library::{SortOrder, format_duration};
use crate::playlist::{LoopMode, lock};

const CONTROLS: &[(&str, &str)] = &[
    ("j/k", "up/down"),
    ("gg/G", "top/bottom"),
    ("enter", "play now"),
    ("space/p", "play/pause"),
    ("h/l", "prev/next song"),
    ("H/L", "scrub"),
    ("1-5", "sort"),
    ("o", "open dir"),
    ("e/u", "mark/refresh tags"),
    ("s", "shuffle"),
    ("r", "loop mode"),
    ("+/-", "volume"),
    ("m", "mute"),
    ("q", "quit"),
];

/// Footer help text. The scrub entry shows the configured step.
fn controls_text(scrub_seconds: u64) -> String {
    CONTROLS
        .iter()
        .map(|(k, v)| {
            if *k == "H/L" {
                format!("[H/L] scrub -/+{scrub_seconds}s")
            } else {
                format!("[{k}] {v}")
            }
        })
        .collect::<Vec<String>>()
        .join(" | ")
}

fn left_pad() -> Padding {
    Padding {
        left: 1,
        right: 0,
        top: 0,
        bottom: 0,
    }
}

fn loop_text(mode: LoopMode) -> &'static str {
    match mode {
        LoopMode::NoLoop => "No-loop",
        LoopMode::LoopAll => "Loop-around",
        LoopMode::LoopOne => "Repeat-one",
    }
}

/// The now-playing panel: track, progress and playback modes.
fn now_playing_text(app: &App) -> String {
    let mut parts: Vec<String> = Vec::new();

    match &app.now_playing {
        Some(np) => {
            let song = app.window_title().unwrap_or_else(|| np.title.clone());
            let elapsed = format_duration(app.elapsed);
            if np.duration.is_empty() {
                parts.push(format!("Song: {song} [{elapsed}]"));
            } else {
                parts.push(format!("Song: {song} [{elapsed}/{}]", np.duration));
            }
            parts.push(
                match app.playback {
                    PlayerState::Playing => "Playing",
                    PlayerState::Paused => "Paused",
                    PlayerState::Stopped => "Stopped",
                }
                .to_string(),
            );
        }
        None => parts.push("Stopped".to_string()),
    }

    {
        let pl = lock(&app.playlist);
        parts.push(format!("PLAYBACK: {}", loop_text(pl.loop_mode())));
        parts.push(format!(
            "Shuffle: {}",
            if pl.shuffle() { "ON" } else { "OFF" }
        ));
    }

    if app.muted {
        parts.push("Volume: muted".to_string());
    } else {
        parts.push(format!("Volume: {}%", app.volume));
    }

    if let Some(dir) = &app.current_dir {
        parts.push(format!("Dir: {}", dir.display()));
    }

    parts.join(" • ")
}

fn status_line(app: &App) -> String {
    match app.input_mode {
        InputMode::OpenDirectory => format!("Open directory: {}▏", app.input),
        InputMode::Normal => {
            let mut line = app.status.clone().unwrap_or_default();
            if app.library.is_scanning() {
                if !line.is_empty() {
                    line.push_str(" • ");
                }
                line.push_str("scanning…");
            }
            line
        }
    }
}

/// Render the entire UI into `frame`.
pub fn draw(frame: &mut Frame, app: &App, settings: &Settings) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(4),
        ])
        .split(frame.area());

    let now_playing = Paragraph::new(now_playing_text(app))
        .block(Block::bordered().padding(left_pad()).title(" now playing "))
        .wrap(Wrap { trim: true });
    frame.render_widget(now_playing, chunks[0]);

    // Library table
    {
        let arrow = match app.library.last_sort() {
            None => String::new(),
            Some(SortOrder::Ascending) => ", ▲".to_string(),
            Some(SortOrder::Descending) => ", ▼".to_string(),
        };
        let header = Row::new(
            (0..app.library.column_count())
                .filter_map(|c| app.library.header_data(c))
                .map(Cell::from),
        )
        .style(Style::default().add_modifier(Modifier::BOLD));

        // Only build rows for the visible window.
        let total = app.library.row_count();
        let selected = app.selected.min(total.saturating_sub(1));
        let height = chunks[1].height.saturating_sub(3) as usize;
        let (start, end) = if total <= height || height == 0 {
            (0, total)
        } else {
            let half = height / 2;
            let mut start = selected.saturating_sub(half);
            if start + height > total {
                start = total - height;
            }
            (start, start + height)
        };

        let rows: Vec<Row> = (start..end)
            .map(|r| {
                Row::new(
                    (0..app.library.column_count())
                        .map(|c| Cell::from(app.library.data(r, c).unwrap_or_default())),
                )
            })
            .collect();

        let title = format!("{}({} songs{}) ", settings.ui.header_text, total, arrow);
        let table = Table::new(
            rows,
            [
                Constraint::Percentage(30),
                Constraint::Percentage(22),
                Constraint::Percentage(22),
                Constraint::Percentage(16),
                Constraint::Length(9),
            ],
        )
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .title_alignment(Alignment::Center),
        )
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");

        let mut state = TableState::default();
        if total > 0 {
            state.select(Some(selected - start));
        }
        frame.render_stateful_widget(table, chunks[1], &mut state);
    }

    let status = Paragraph::new(Line::from(status_line(app)))
        .block(Block::bordered().padding(left_pad()).title(" status "));
    let status = if app.input_mode == InputMode::OpenDirectory {
        status.bold()
    } else {
        status
    };
    frame.render_widget(status, chunks[2]);

    let footer = Paragraph::new(controls_text(settings.controls.scrub_seconds))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(left_pad()),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[3]);
}

/// Terminal title: `artist - title` of the current track, or the app name.
pub fn terminal_title(app: &App) -> String {
    app.window_title().unwrap_or_else(|| "astoria".to_string())
}
