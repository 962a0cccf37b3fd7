/// Transport state shared by every track of the player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub current_time: f64, // Shared timeline position in seconds
    pub duration: f64,
}

impl PlaybackState {
    pub fn new() -> Self {
        Self {
            is_playing: false,
            current_time: 0.0,
            duration: 0.0,
        }
    }

    /// True once a duration has been reported by one of the tracks.
    pub fn has_duration(&self) -> bool {
        self.duration > 0.0
    }

    /// Upper bound of the seek slider; 100 s until a duration is known.
    pub fn seek_max(&self) -> f64 {
        if self.has_duration() {
            self.duration
        } else {
            100.0
        }
    }

    pub fn at_end(&self) -> bool {
        self.has_duration() && self.current_time >= self.duration
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new()
    }
}
