//! In-memory playback backend used by the player tests

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use crate::error::{PlayerError, PlayerResult};
use crate::playback::handle::{HandleEvent, PlaybackBackend, TrackHandle};
use crate::types::stem::StemKey;

/// Observable state of one fake handle
#[derive(Debug, Default, Clone)]
pub struct FakeTrack {
    pub source: String,
    pub playing: bool,
    pub position: f64,
    pub gain: f64,
    pub released: bool,
    pub seeks: Vec<f64>,
    pub pending: VecDeque<HandleEvent>,
}

type Shared = Rc<RefCell<BTreeMap<StemKey, FakeTrack>>>;

/// Backend whose handles record every call; tests keep a clone of the
/// shared map to inspect handles owned by the player.
#[derive(Clone, Default)]
pub struct FakeBackend {
    tracks: Shared,
    /// Sources that fail to open
    pub broken_sources: Vec<String>,
    pub opened: Rc<RefCell<usize>>,
    /// Opens that happened while the previous handle for the key was live
    pub opened_over_live: Rc<RefCell<usize>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, key: StemKey) -> FakeTrack {
        self.tracks.borrow().get(&key).cloned().unwrap_or_default()
    }

    pub fn is_playing(&self, key: StemKey) -> bool {
        self.track(key).playing
    }

    pub fn position(&self, key: StemKey) -> f64 {
        self.track(key).position
    }

    /// Queue an event that the handle reports on the next poll.
    pub fn push_event(&self, key: StemKey, event: HandleEvent) {
        if let Some(track) = self.tracks.borrow_mut().get_mut(&key) {
            track.pending.push_back(event);
        }
    }

    /// Advance every playing handle by `seconds` and report the new position.
    pub fn advance(&self, seconds: f64) {
        for track in self.tracks.borrow_mut().values_mut() {
            if track.playing && !track.released {
                track.position += seconds;
                let position = track.position;
                track.pending.push_back(HandleEvent::TimeUpdate { position });
            }
        }
    }
}

impl PlaybackBackend for FakeBackend {
    type Handle = FakeHandle;

    fn open(&mut self, key: StemKey, source: &str) -> PlayerResult<FakeHandle> {
        if self.broken_sources.iter().any(|s| s == source) {
            return Err(PlayerError::InvalidSource(source.to_string()));
        }
        *self.opened.borrow_mut() += 1;
        if self.tracks.borrow().get(&key).is_some_and(|t| !t.released) {
            *self.opened_over_live.borrow_mut() += 1;
        }
        self.tracks.borrow_mut().insert(
            key,
            FakeTrack {
                source: source.to_string(),
                gain: 1.0,
                ..FakeTrack::default()
            },
        );
        Ok(FakeHandle {
            key,
            tracks: self.tracks.clone(),
        })
    }
}

pub struct FakeHandle {
    key: StemKey,
    tracks: Shared,
}

impl FakeHandle {
    fn with<R>(&self, f: impl FnOnce(&mut FakeTrack) -> R) -> PlayerResult<R> {
        let mut tracks = self.tracks.borrow_mut();
        match tracks.get_mut(&self.key) {
            Some(track) if !track.released => Ok(f(track)),
            _ => Err(PlayerError::Released(self.key)),
        }
    }
}

impl TrackHandle for FakeHandle {
    fn play(&mut self) -> PlayerResult<()> {
        self.with(|t| t.playing = true)
    }

    fn pause(&mut self) -> PlayerResult<()> {
        self.with(|t| t.playing = false)
    }

    fn seek(&mut self, time: f64) -> PlayerResult<()> {
        self.with(|t| {
            t.position = time;
            t.seeks.push(time);
        })
    }

    fn set_volume(&mut self, gain: f64) -> PlayerResult<()> {
        self.with(|t| t.gain = gain)
    }

    fn poll_events(&mut self) -> Vec<HandleEvent> {
        self.with(|t| t.pending.drain(..).collect::<Vec<_>>())
            .unwrap_or_default()
    }

    fn release(&mut self) {
        if let Some(track) = self.tracks.borrow_mut().get_mut(&self.key) {
            track.playing = false;
            track.released = true;
        }
    }
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        self.release();
    }
}
