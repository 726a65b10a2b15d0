use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A tag field shown as a library column.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Title,
    Artist,
    Album,
    Genre,
    Duration,
}

impl Field {
    /// Column order of the library table.
    pub const ALL: [Field; 5] = [
        Field::Title,
        Field::Artist,
        Field::Album,
        Field::Genre,
        Field::Duration,
    ];

    pub fn header(self) -> &'static str {
        match self {
            Field::Title => "Title",
            Field::Artist => "Artist",
            Field::Album => "Album",
            Field::Genre => "Genre",
            Field::Duration => "Duration",
        }
    }

    pub fn from_column(column: usize) -> Option<Field> {
        Self::ALL.get(column).copied()
    }
}

/// Tag values keyed by field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata(BTreeMap<Field, String>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    /// Value of `field`, or `""` when the file had none.
    pub fn value(&self, field: Field) -> &str {
        self.get(field).unwrap_or("")
    }

    pub fn insert(&mut self, field: Field, value: impl Into<String>) {
        self.0.insert(field, value.into());
    }

    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.insert(field, value);
        self
    }
}

/// One library entry: the file and the tags read from it.
///
/// The path is fixed at construction. Metadata is only ever swapped out as a
/// whole, never edited field by field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Song {
    path: PathBuf,
    metadata: Metadata,
}

impl Song {
    pub fn new(path: impl Into<PathBuf>, metadata: Metadata) -> Self {
        Self {
            path: path.into(),
            metadata,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn replace_metadata(&mut self, metadata: Metadata) {
        self.metadata = metadata;
    }

    pub fn artist(&self) -> &str {
        self.metadata.value(Field::Artist)
    }
}

/// Format a track length as `m:ss`, or `h:mm:ss` past the hour.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let (h, m, s) = (secs / 3600, (secs / 60) % 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}
