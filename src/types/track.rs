use crate::types::stem::StemKey;

pub const MAX_VOLUME: u8 = 100;

#[derive(Debug, Clone, PartialEq)]
pub enum TrackStatus {
    /// Handle created, no metadata seen yet
    Loading,
    Ready,
    /// Source failed; the track degrades to silence
    Errored(String),
}

/// Per-stem state owned by the player. The playable handle lives next to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub key: StemKey,
    pub source_url: String,
    pub enabled: bool,
    pub volume: u8, // Percentage, 0-100
    pub status: TrackStatus,
    /// Set when the handle reported end of stream during the current run
    pub ended: bool,
}

impl Track {
    pub fn new(key: StemKey, source_url: String, volume: u8) -> Self {
        Track {
            key,
            source_url,
            enabled: true,
            volume: volume.min(MAX_VOLUME),
            status: TrackStatus::Loading,
            ended: false,
        }
    }

    pub fn is_errored(&self) -> bool {
        matches!(self.status, TrackStatus::Errored(_))
    }

    /// Normalized gain applied to the handle.
    pub fn gain(&self) -> f64 {
        f64::from(self.volume) / f64::from(MAX_VOLUME)
    }
}
