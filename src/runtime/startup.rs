use std::env;
use std::path::PathBuf;

use crate::config::Settings;

/// Directory scanned at startup: the first argument, else the configured
/// library directory, else the current directory.
pub fn startup_directory(arg: Option<String>, settings: &Settings) -> Option<PathBuf> {
    arg.map(PathBuf::from)
        .or_else(|| settings.library.directory.clone())
        .or_else(|| env::current_dir().ok())
}
