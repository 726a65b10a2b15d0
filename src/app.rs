//! Application module: the model the TUI renders and the runtime drives.
//!
//! `App` lives in `app::model`. It owns the library table, shares the
//! playlist with it and tracks selection, playback and prompt state.

mod model;

pub use model::*;
