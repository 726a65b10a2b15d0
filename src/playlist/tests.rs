use super::*;
use crate::library::{MediaQueue, NowPlaying};
use std::path::{Path, PathBuf};

fn playlist(names: &[&str]) -> Playlist {
    let mut p = Playlist::new();
    for n in names {
        p.add_media(format!("/m/{n}"));
    }
    p
}

#[test]
fn next_starts_at_first_item_and_stops_past_the_end() {
    let mut p = playlist(&["a", "b"]);
    assert_eq!(p.current_index(), None);
    assert_eq!(p.next(), Some(0));
    assert_eq!(p.next(), Some(1));
    assert_eq!(p.next(), None);
    assert_eq!(p.current_media(), None);
}

#[test]
fn next_wraps_in_loop_all() {
    let mut p = playlist(&["a", "b"]);
    p.set_loop_mode(LoopMode::LoopAll);
    p.set_current_index(1);
    assert_eq!(p.next(), Some(0));
}

#[test]
fn next_on_empty_playlist_is_none() {
    let mut p = Playlist::new();
    assert_eq!(p.next(), None);
    assert!(p.is_empty());
}

#[test]
fn previous_steps_back_and_wraps_only_in_loop_all() {
    let mut p = playlist(&["a", "b", "c"]);
    p.set_current_index(1);
    assert_eq!(p.previous(), Some(0));
    assert_eq!(p.previous(), None);
    assert_eq!(p.current_index(), Some(0));

    p.set_loop_mode(LoopMode::LoopAll);
    assert_eq!(p.previous(), Some(2));
}

#[test]
fn advance_on_finish_repeats_in_loop_one() {
    let mut p = playlist(&["a", "b"]);
    p.set_loop_mode(LoopMode::LoopOne);
    p.set_current_index(0);
    assert_eq!(p.advance_on_finish(), Some(0));

    // Manual next still moves on.
    assert_eq!(p.next(), Some(1));
}

#[test]
fn insert_before_current_keeps_current_file() {
    let mut p = playlist(&["a", "b"]);
    p.set_current_index(1);
    p.insert_media(0, "/m/new");
    assert_eq!(p.current_index(), Some(2));
    assert_eq!(p.current_media(), Some(Path::new("/m/b")));
    assert_eq!(p.media(0), Some(Path::new("/m/new")));

    p.insert_media(99, "/m/end");
    assert_eq!(p.media(3), Some(Path::new("/m/end")));
}

#[test]
fn set_current_index_rejects_out_of_range() {
    let mut p = playlist(&["a"]);
    assert!(!p.set_current_index(1));
    assert_eq!(p.current_index(), None);
    assert!(p.set_current_index(0));
}

#[test]
fn shuffle_never_repeats_the_current_item() {
    let mut p = playlist(&["a", "b", "c", "d"]);
    p.toggle_shuffle();
    p.set_current_index(2);
    for _ in 0..32 {
        let before = p.current_index();
        let after = p.next();
        assert!(after.is_some());
        assert_ne!(after, before);
    }
}

#[test]
fn cycle_loop_mode_cycles_three_states() {
    let mut p = Playlist::new();
    assert_eq!(p.loop_mode(), LoopMode::NoLoop);
    assert_eq!(p.cycle_loop_mode(), LoopMode::LoopAll);
    assert_eq!(p.cycle_loop_mode(), LoopMode::LoopOne);
    assert_eq!(p.cycle_loop_mode(), LoopMode::NoLoop);
}

#[test]
fn handle_serves_as_queue_and_now_playing() {
    let mut handle = Playlist::new().into_handle();
    handle.add_media(Path::new("/m/a"));
    handle.add_media(Path::new("/m/b"));
    assert_eq!(NowPlaying::current_media(&handle), None);

    lock(&handle).set_current_index(1);
    assert_eq!(
        NowPlaying::current_media(&handle),
        Some(PathBuf::from("/m/b"))
    );
}
