//! Opening a file into a `rodio` sink.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use rodio::{Decoder, OutputStream, Sink, Source};

use crate::error::PlayerError;

/// Create a paused `Sink` playing `path` from `start`.
pub(super) fn create_sink(
    stream: &OutputStream,
    path: &Path,
    start: Duration,
) -> Result<Sink, PlayerError> {
    let file = File::open(path).map_err(|source| PlayerError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let source = Decoder::new(BufReader::new(file)).map_err(|e| PlayerError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let sink = Sink::connect_new(stream.mixer());
    if start.is_zero() {
        sink.append(source);
    } else {
        sink.append(source.skip_duration(start));
    }
    sink.pause();
    Ok(sink)
}
