//! The playback queue: an ordered list of locators with a current position,
//! loop mode and shuffle.
//!
//! The library appends to it through [`MediaQueue`](crate::library::MediaQueue)
//! and asks it for the current track through
//! [`NowPlaying`](crate::library::NowPlaying).

mod model;

pub use model::*;

#[cfg(test)]
mod tests;
