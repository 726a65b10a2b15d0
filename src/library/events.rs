/// Change notifications published by [`LibraryModel`](super::LibraryModel).
///
/// For one merged batch the model sends every `RowInserted` first and a
/// single `LibraryChanged` last.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LibraryEvent {
    /// A song was appended at this row.
    RowInserted(usize),
    /// A batch added at least one song.
    LibraryChanged,
    /// Rows were reordered or rewritten in place.
    FullTableChanged,
    /// The metadata of the currently playing song was refreshed.
    TrackMetadataChanged,
}
