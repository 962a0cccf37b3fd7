use crate::error::PlayerResult;
use crate::types::stem::StemKey;

/// Notifications a handle reports about its audio source.
#[derive(Debug, Clone, PartialEq)]
pub enum HandleEvent {
    /// Source metadata is available; duration in seconds
    MetadataLoaded { duration: f64 },
    /// Playback position advanced, in seconds
    TimeUpdate { position: f64 },
    /// Reached end of stream
    Ended,
    /// Source could not be loaded or decoded
    Failed { message: String },
}

/// Playable resource controlling one audio source.
///
/// Handles are owned exclusively by the player. `release` stops playback and
/// frees the source; implementations must also do this on drop.
pub trait TrackHandle {
    fn play(&mut self) -> PlayerResult<()>;
    fn pause(&mut self) -> PlayerResult<()>;
    /// Move the source position to `time` seconds.
    fn seek(&mut self, time: f64) -> PlayerResult<()>;
    /// Apply a gain in [0, 1].
    fn set_volume(&mut self, gain: f64) -> PlayerResult<()>;
    /// Drain events that arrived since the last call.
    fn poll_events(&mut self) -> Vec<HandleEvent>;
    fn release(&mut self);
}

/// Creates track handles for stem sources.
pub trait PlaybackBackend {
    type Handle: TrackHandle;

    fn open(&mut self, key: StemKey, source: &str) -> PlayerResult<Self::Handle>;
}
