//! Error types for the library and the audio engine.

use std::path::PathBuf;

use lofty::error::LoftyError;
use thiserror::Error;

/// Errors raised by the library model and the tag reader.
#[derive(Error, Debug)]
pub enum LibraryError {
    /// The scan target does not exist or is not a directory.
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    /// `update_metadata` was called without a row marked for update.
    #[error("no row is marked for a metadata update")]
    NoPendingEdit,
    /// A row index pointed past the end of the table.
    #[error("row {row} is out of range (library has {len} rows)")]
    RowOutOfRange { row: usize, len: usize },
    /// The tag-parsing library rejected the file.
    #[error("failed to read tags: {0}")]
    Tag(#[from] LoftyError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised inside the audio engine thread.
#[derive(Error, Debug)]
pub enum PlayerError {
    /// No output device could be opened.
    #[error("audio output unavailable: {0}")]
    Output(String),
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },
}
