use serde::{Deserialize, Serialize};

/// Number of stems in a stem set
pub const NUM_STEMS: usize = 4;

/// One isolated component of a mixed song
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StemKey {
    Vocals,
    Bass,
    Drums,
    Other,
}

impl StemKey {
    /// All stems in display order
    pub const ALL: [StemKey; NUM_STEMS] = [
        StemKey::Vocals,
        StemKey::Bass,
        StemKey::Drums,
        StemKey::Other,
    ];

    /// Identifier used in file names and stem set files
    pub fn id(&self) -> &'static str {
        match self {
            StemKey::Vocals => "vocals",
            StemKey::Bass => "bass",
            StemKey::Drums => "drums",
            StemKey::Other => "other",
        }
    }

    /// Label shown next to the stem's controls
    pub fn label(&self) -> &'static str {
        match self {
            StemKey::Vocals => "Vocals",
            StemKey::Bass => "Bass",
            StemKey::Drums => "Drums",
            StemKey::Other => "Other Instruments",
        }
    }
}

impl std::fmt::Display for StemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Source locations for the four stems of one song.
///
/// Each entry is either a URI (`file://`, `http://`, ...) or a local path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StemSet {
    pub vocals: String,
    pub bass: String,
    pub drums: String,
    pub other: String,
}

impl StemSet {
    pub fn source(&self, key: StemKey) -> &str {
        match key {
            StemKey::Vocals => &self.vocals,
            StemKey::Bass => &self.bass,
            StemKey::Drums => &self.drums,
            StemKey::Other => &self.other,
        }
    }

    /// Iterate `(key, source)` pairs in display order.
    pub fn iter(&self) -> impl Iterator<Item = (StemKey, &str)> {
        StemKey::ALL.into_iter().map(move |key| (key, self.source(key)))
    }

    /// Builds a stem set where every stem points at the same source.
    #[cfg(test)]
    pub fn uniform(source: &str) -> Self {
        StemSet {
            vocals: source.to_string(),
            bass: source.to_string(),
            drums: source.to_string(),
            other: source.to_string(),
        }
    }
}

/// A stem set together with the song it belongs to, as handed to the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StemSource {
    pub stems: StemSet,
    pub song_name: Option<String>,
}

impl StemSource {
    pub fn new(stems: StemSet, song_name: Option<String>) -> Self {
        StemSource { stems, song_name }
    }
}
