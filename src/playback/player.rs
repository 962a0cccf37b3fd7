use std::collections::BTreeMap;

use crate::error::PlayerResult;
use crate::playback::handle::{HandleEvent, PlaybackBackend, TrackHandle};
use crate::types::playback_state::PlaybackState;
use crate::types::stem::{StemKey, StemSource};
use crate::types::track::{MAX_VOLUME, Track, TrackStatus};

/// Durations reported by different stems are expected to match within this.
const DURATION_TOLERANCE: f64 = 0.05;

/// Multi-track player keeping every stem handle on one shared timeline.
///
/// Every command applies to all affected handles before returning and
/// yields the resulting [`PlaybackState`]. Handle failures never propagate:
/// the failing track is marked errored and excluded from later effects.
pub struct StemPlayer<B: PlaybackBackend> {
    backend: B,
    song_name: Option<String>,
    tracks: Vec<Track>,
    handles: BTreeMap<StemKey, B::Handle>,
    state: PlaybackState,
    default_volume: u8,
}

impl<B: PlaybackBackend> StemPlayer<B> {
    pub fn new(backend: B, default_volume: u8) -> Self {
        Self {
            backend,
            song_name: None,
            tracks: Vec::new(),
            handles: BTreeMap::new(),
            state: PlaybackState::new(),
            default_volume: default_volume.min(MAX_VOLUME),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, key: StemKey) -> Option<&Track> {
        self.tracks.iter().find(|t| t.key == key)
    }

    fn track_mut(&mut self, key: StemKey) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.key == key)
    }

    pub fn song_name(&self) -> Option<&str> {
        self.song_name.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        !self.tracks.is_empty()
    }

    /// Replace the current stem set. Previous handles are released before
    /// any new handle is opened.
    pub fn load(&mut self, source: StemSource) -> PlaybackState {
        self.unload();
        log::info!(
            "Loading stems for {}",
            source.song_name.as_deref().unwrap_or("untitled song")
        );

        self.song_name = source.song_name;
        for (key, url) in source.stems.iter() {
            let mut track = Track::new(key, url.to_string(), self.default_volume);
            let opened = self
                .backend
                .open(key, url)
                .and_then(|mut handle| handle.set_volume(track.gain()).map(|_| handle));
            match opened {
                Ok(handle) => {
                    self.handles.insert(key, handle);
                }
                Err(err) => {
                    log::warn!("Could not open {} stem '{}': {}", key, url, err);
                    track.status = TrackStatus::Errored(err.to_string());
                }
            }
            self.tracks.push(track);
        }
        self.state
    }

    /// Stop and release every handle and forget the stem set.
    pub fn unload(&mut self) {
        if self.tracks.is_empty() && self.handles.is_empty() {
            return;
        }
        for (key, mut handle) in std::mem::take(&mut self.handles) {
            handle.release();
            log::debug!("Released {} handle", key);
        }
        log::info!(
            "Unloaded stems for {}",
            self.song_name.as_deref().unwrap_or("untitled song")
        );
        self.tracks.clear();
        self.song_name = None;
        self.state = PlaybackState::new();
    }

    /// Run `op` on the handle for `key` unless the track is errored. A
    /// failing handle marks its track errored.
    fn drive(&mut self, key: StemKey, op: impl FnOnce(&mut B::Handle) -> PlayerResult<()>) {
        if self.track(key).is_none_or(Track::is_errored) {
            return;
        }
        let Some(handle) = self.handles.get_mut(&key) else {
            return;
        };
        if let Err(err) = op(handle) {
            self.mark_errored(key, err.to_string());
        }
    }

    fn mark_errored(&mut self, key: StemKey, message: String) {
        log::warn!("{} stem failed: {}", key, message);
        if let Some(handle) = self.handles.get_mut(&key) {
            let _ = handle.pause();
        }
        if let Some(track) = self.track_mut(key) {
            track.status = TrackStatus::Errored(message);
        }
        self.check_finished();
    }

    fn keys(&self) -> Vec<StemKey> {
        self.tracks.iter().map(|t| t.key).collect()
    }

    /// Tracks whose handle should currently be producing sound.
    fn is_running(&self, key: StemKey) -> bool {
        self.state.is_playing
            && self
                .track(key)
                .is_some_and(|t| t.enabled && !t.is_errored())
    }

    pub fn toggle_play_pause(&mut self) -> PlaybackState {
        if !self.is_loaded() {
            return self.state;
        }
        if self.state.is_playing {
            // Paused regardless of enabled state so every position is kept.
            for key in self.keys() {
                self.drive(key, |h| h.pause());
            }
            self.state.is_playing = false;
            log::debug!("Paused at {:.2}s", self.state.current_time);
        } else {
            if self.state.at_end() {
                self.seek(0.0);
            }
            for key in self.keys() {
                if self.track(key).is_some_and(|t| t.enabled) {
                    self.start(key);
                }
            }
            self.state.is_playing = true;
            log::debug!("Playing from {:.2}s", self.state.current_time);
        }
        self.state
    }

    fn start(&mut self, key: StemKey) {
        if let Some(track) = self.track_mut(key) {
            track.ended = false;
        }
        self.drive(key, |h| h.play());
    }

    /// Bring a single handle in line with its track's enabled flag.
    fn apply_enabled(&mut self, key: StemKey, enabled: bool) {
        if enabled {
            let time = self.state.current_time;
            self.drive(key, |h| h.seek(time));
            self.start(key);
        } else {
            self.drive(key, |h| h.pause());
        }
    }

    pub fn set_track_enabled(&mut self, key: StemKey, enabled: bool) -> PlaybackState {
        let Some(track) = self.track_mut(key) else {
            return self.state;
        };
        if track.enabled == enabled {
            return self.state;
        }
        track.enabled = enabled;
        log::debug!("{} stem {}", key, if enabled { "enabled" } else { "disabled" });

        if self.state.is_playing {
            self.apply_enabled(key, enabled);
            self.check_finished();
        }
        self.state
    }

    pub fn toggle_track(&mut self, key: StemKey) -> PlaybackState {
        match self.track(key) {
            Some(track) => {
                let enabled = !track.enabled;
                self.set_track_enabled(key, enabled)
            }
            None => self.state,
        }
    }

    /// Set every track's flag in one pass, then drive the handles whose flag
    /// changed.
    pub fn set_all_enabled(&mut self, enabled: bool) -> PlaybackState {
        let mut changed = Vec::new();
        for track in self.tracks.iter_mut() {
            if track.enabled != enabled {
                track.enabled = enabled;
                changed.push(track.key);
            }
        }
        if changed.is_empty() {
            return self.state;
        }
        log::debug!(
            "{} all stems",
            if enabled { "Enabled" } else { "Disabled" }
        );

        if self.state.is_playing {
            for key in changed {
                self.apply_enabled(key, enabled);
            }
            self.check_finished();
        }
        self.state
    }

    /// True iff every usable track is enabled. Errored tracks are ignored
    /// unless no track is usable.
    pub fn all_enabled(&self) -> bool {
        if self.tracks.is_empty() {
            return false;
        }
        let mut usable = self.tracks.iter().filter(|t| !t.is_errored()).peekable();
        if usable.peek().is_none() {
            return self.tracks.iter().all(|t| t.enabled);
        }
        usable.all(|t| t.enabled)
    }

    pub fn toggle_all(&mut self) -> PlaybackState {
        let enabled = !self.all_enabled();
        self.set_all_enabled(enabled)
    }

    /// Move the shared timeline and every handle to `time`, enabled or not.
    pub fn seek(&mut self, time: f64) -> PlaybackState {
        if !time.is_finite() || !self.is_loaded() {
            return self.state;
        }
        let mut time = time.max(0.0);
        if self.state.has_duration() {
            time = time.min(self.state.duration);
        }
        self.state.current_time = time;
        for key in self.keys() {
            if let Some(track) = self.track_mut(key) {
                track.ended = false;
            }
            self.drive(key, |h| h.seek(time));
        }
        log::debug!("Seeked to {:.2}s", time);
        self.state
    }

    /// Store a 0-100 volume and apply its gain to that stem's handle only.
    pub fn set_volume(&mut self, key: StemKey, value: u8) -> PlaybackState {
        let Some(track) = self.track_mut(key) else {
            return self.state;
        };
        track.volume = value.min(MAX_VOLUME);
        let gain = track.gain();
        self.drive(key, |h| h.set_volume(gain));
        self.state
    }

    /// Drain pending events from every handle and fold them into the state.
    pub fn pump_events(&mut self) -> PlaybackState {
        let keys: Vec<StemKey> = self.handles.keys().copied().collect();
        for key in keys {
            let events = match self.handles.get_mut(&key) {
                Some(handle) => handle.poll_events(),
                None => continue,
            };
            for event in events {
                self.apply_event(key, event);
            }
        }
        self.state
    }

    fn apply_event(&mut self, key: StemKey, event: HandleEvent) {
        if self.track(key).is_none_or(Track::is_errored) {
            return;
        }
        match event {
            HandleEvent::MetadataLoaded { duration } => {
                if let Some(track) = self.track_mut(key) {
                    track.status = TrackStatus::Ready;
                }
                if !duration.is_finite() || duration <= 0.0 {
                    return;
                }
                if !self.state.has_duration() {
                    self.state.duration = duration;
                    log::info!("Duration {:.2}s reported by {} stem", duration, key);
                } else if (self.state.duration - duration).abs() > DURATION_TOLERANCE {
                    log::debug!(
                        "{} stem reports {:.2}s, keeping {:.2}s",
                        key,
                        duration,
                        self.state.duration
                    );
                }
            }
            HandleEvent::TimeUpdate { position } => {
                if self.is_running(key) && position.is_finite() {
                    self.state.current_time = position;
                }
            }
            HandleEvent::Ended => {
                if let Some(track) = self.track_mut(key) {
                    track.ended = true;
                }
                self.check_finished();
            }
            HandleEvent::Failed { message } => self.mark_errored(key, message),
        }
    }

    /// Stop the transport once every running track has reached its end.
    fn check_finished(&mut self) {
        if !self.state.is_playing {
            return;
        }
        let mut running = self
            .tracks
            .iter()
            .filter(|t| t.enabled && !t.is_errored())
            .peekable();
        if running.peek().is_none() || !running.all(|t| t.ended) {
            return;
        }
        for key in self.keys() {
            self.drive(key, |h| h.pause());
        }
        self.state.is_playing = false;
        if self.state.has_duration() {
            self.state.current_time = self.state.duration;
        }
        log::info!("Playback finished");
    }
}

impl<B: PlaybackBackend> Drop for StemPlayer<B> {
    fn drop(&mut self) {
        self.unload();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::testing::FakeBackend;
    use crate::types::stem::StemSet;

    fn stem_source() -> StemSource {
        StemSource::new(
            StemSet {
                vocals: "vocals.mp3".to_string(),
                bass: "bass.mp3".to_string(),
                drums: "drums.mp3".to_string(),
                other: "other.mp3".to_string(),
            },
            Some("Demo Track".to_string()),
        )
    }

    fn loaded_player() -> (StemPlayer<FakeBackend>, FakeBackend) {
        let backend = FakeBackend::new();
        let mut player = StemPlayer::new(backend.clone(), 100);
        player.load(stem_source());
        (player, backend)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_load_creates_enabled_tracks() {
        let (player, backend) = loaded_player();
        assert_eq!(player.tracks().len(), 4);
        assert_eq!(player.song_name(), Some("Demo Track"));
        assert!(player.all_enabled());
        assert!(!player.state().is_playing);
        for key in StemKey::ALL {
            let track = player.track(key).unwrap();
            assert_eq!(track.volume, 100);
            assert_eq!(track.status, TrackStatus::Loading);
            assert_eq!(track.source_url, format!("{}.mp3", key.id()));
            assert_eq!(backend.track(key).source, format!("{}.mp3", key.id()));
            assert!(approx(backend.track(key).gain, 1.0));
        }
    }

    #[test]
    fn test_first_reported_duration_is_authoritative() {
        let (mut player, backend) = loaded_player();
        backend.push_event(StemKey::Drums, HandleEvent::MetadataLoaded { duration: 180.0 });
        backend.push_event(StemKey::Vocals, HandleEvent::MetadataLoaded { duration: 180.2 });
        let state = player.pump_events();
        assert!(approx(state.duration, 180.0) || approx(state.duration, 180.2));
        let first = state.duration;

        backend.push_event(StemKey::Bass, HandleEvent::MetadataLoaded { duration: 95.0 });
        assert!(approx(player.pump_events().duration, first));
        assert_eq!(player.track(StemKey::Bass).unwrap().status, TrackStatus::Ready);
    }

    #[test]
    fn test_toggle_twice_restores_state_and_positions() {
        let (mut player, backend) = loaded_player();
        player.seek(12.0);
        assert!(player.toggle_play_pause().is_playing);
        assert!(!player.toggle_play_pause().is_playing);
        for key in StemKey::ALL {
            assert!(!backend.is_playing(key));
            assert!(approx(backend.position(key), 12.0));
        }
        assert!(approx(player.state().current_time, 12.0));
    }

    #[test]
    fn test_play_starts_only_enabled_tracks() {
        let (mut player, backend) = loaded_player();
        player.set_track_enabled(StemKey::Vocals, false);
        player.toggle_play_pause();
        assert!(!backend.is_playing(StemKey::Vocals));
        assert!(backend.is_playing(StemKey::Bass));
        assert!(backend.is_playing(StemKey::Drums));
        assert!(backend.is_playing(StemKey::Other));
    }

    #[test]
    fn test_disable_while_playing_pauses_only_that_track() {
        let (mut player, backend) = loaded_player();
        player.toggle_play_pause();
        player.set_track_enabled(StemKey::Drums, false);
        assert!(!backend.is_playing(StemKey::Drums));
        for key in [StemKey::Vocals, StemKey::Bass, StemKey::Other] {
            assert!(backend.is_playing(key));
        }
        assert!(player.state().is_playing);
        assert!(!player.all_enabled());
    }

    #[test]
    fn test_enable_while_playing_seeks_to_shared_time() {
        let (mut player, backend) = loaded_player();
        player.set_track_enabled(StemKey::Other, false);
        player.toggle_play_pause();
        backend.advance(7.5);
        player.pump_events();
        assert!(approx(player.state().current_time, 7.5));

        player.set_track_enabled(StemKey::Other, true);
        let other = backend.track(StemKey::Other);
        assert!(other.playing);
        assert_eq!(other.seeks.last().copied(), Some(7.5));
        assert!(approx(other.position, 7.5));
    }

    #[test]
    fn test_time_updates_from_disabled_tracks_are_ignored() {
        let (mut player, backend) = loaded_player();
        player.toggle_play_pause();
        player.set_track_enabled(StemKey::Bass, false);
        backend.push_event(StemKey::Bass, HandleEvent::TimeUpdate { position: 99.0 });
        assert!(approx(player.pump_events().current_time, 0.0));
    }

    #[test]
    fn test_set_all_enabled_is_idempotent() {
        let (mut player, backend) = loaded_player();
        player.toggle_play_pause();
        let first = player.set_all_enabled(true);
        let second = player.set_all_enabled(true);
        assert_eq!(first, second);
        assert!(player.all_enabled());
        for key in StemKey::ALL {
            assert!(backend.track(key).seeks.is_empty());
        }
    }

    #[test]
    fn test_toggle_all_flips_indicator() {
        let (mut player, backend) = loaded_player();
        player.toggle_play_pause();
        player.toggle_all();
        assert!(player.tracks().iter().all(|t| !t.enabled));
        assert!(StemKey::ALL.iter().all(|k| !backend.is_playing(*k)));

        // Partially enabled reads as "not all", so toggling enables everything.
        player.set_track_enabled(StemKey::Vocals, true);
        assert!(!player.all_enabled());
        player.toggle_all();
        assert!(player.all_enabled());
        assert!(StemKey::ALL.iter().all(|k| backend.is_playing(*k)));
    }

    #[test]
    fn test_seek_moves_every_track() {
        let (mut player, backend) = loaded_player();
        player.set_track_enabled(StemKey::Vocals, false);
        let state = player.seek(42.0);
        assert!(approx(state.current_time, 42.0));
        for key in StemKey::ALL {
            assert!(approx(backend.position(key), 42.0));
        }
    }

    #[test]
    fn test_seek_is_clamped_to_duration() {
        let (mut player, backend) = loaded_player();
        backend.push_event(StemKey::Vocals, HandleEvent::MetadataLoaded { duration: 60.0 });
        player.pump_events();
        assert!(approx(player.seek(75.0).current_time, 60.0));
        assert!(approx(player.seek(-3.0).current_time, 0.0));
    }

    #[test]
    fn test_volume_is_per_track() {
        let (mut player, backend) = loaded_player();
        player.set_volume(StemKey::Bass, 40);
        player.set_volume(StemKey::Drums, 250);
        assert_eq!(player.track(StemKey::Bass).unwrap().volume, 40);
        assert_eq!(player.track(StemKey::Drums).unwrap().volume, 100);
        assert!(approx(backend.track(StemKey::Bass).gain, 0.4));
        assert!(approx(backend.track(StemKey::Drums).gain, 1.0));
        assert!(approx(backend.track(StemKey::Vocals).gain, 1.0));
    }

    #[test]
    fn test_mute_seek_unmute_scenario() {
        let (mut player, backend) = loaded_player();
        assert!(player.toggle_play_pause().is_playing);
        assert!(StemKey::ALL.iter().all(|k| backend.is_playing(*k)));

        player.set_track_enabled(StemKey::Bass, false);
        assert!(!backend.is_playing(StemKey::Bass));
        for key in [StemKey::Vocals, StemKey::Drums, StemKey::Other] {
            assert!(backend.is_playing(key));
        }

        player.seek(30.0);
        for key in StemKey::ALL {
            assert!(approx(backend.position(key), 30.0));
        }
        assert!(!backend.is_playing(StemKey::Bass));

        player.set_track_enabled(StemKey::Bass, true);
        assert!(backend.is_playing(StemKey::Bass));
        assert!(approx(backend.position(StemKey::Bass), 30.0));
        assert!(approx(backend.position(StemKey::Vocals), 30.0));
    }

    #[test]
    fn test_reload_releases_before_opening() {
        let (mut player, backend) = loaded_player();
        player.toggle_play_pause();
        let mut next = stem_source();
        next.stems = StemSet::uniform("remix.mp3");
        next.song_name = None;
        let state = player.load(next);

        assert_eq!(*backend.opened.borrow(), 8);
        assert_eq!(*backend.opened_over_live.borrow(), 0);
        assert_eq!(state, PlaybackState::new());
        assert_eq!(player.song_name(), None);
        assert_eq!(backend.track(StemKey::Vocals).source, "remix.mp3");
        assert!(!backend.track(StemKey::Vocals).released);
    }

    #[test]
    fn test_drop_releases_handles() {
        let (mut player, backend) = loaded_player();
        player.toggle_play_pause();
        drop(player);
        for key in StemKey::ALL {
            let track = backend.track(key);
            assert!(track.released);
            assert!(!track.playing);
        }
    }

    #[test]
    fn test_failed_open_marks_track_errored() {
        let mut backend = FakeBackend::new();
        backend.broken_sources.push("bass.mp3".to_string());
        let mut player = StemPlayer::new(backend.clone(), 80);
        player.load(stem_source());

        assert!(player.track(StemKey::Bass).unwrap().is_errored());
        assert!(player.all_enabled());
        assert!(player.toggle_play_pause().is_playing);
        assert!(backend.is_playing(StemKey::Vocals));
        assert!(approx(backend.track(StemKey::Vocals).gain, 0.8));
    }

    #[test]
    fn test_runtime_failure_keeps_duration_and_silences_track() {
        let (mut player, backend) = loaded_player();
        backend.push_event(StemKey::Vocals, HandleEvent::MetadataLoaded { duration: 120.0 });
        player.pump_events();
        player.toggle_play_pause();

        backend.push_event(
            StemKey::Drums,
            HandleEvent::Failed {
                message: "Could not decode stream".to_string(),
            },
        );
        let state = player.pump_events();
        assert!(approx(state.duration, 120.0));
        assert!(state.is_playing);
        assert!(!backend.is_playing(StemKey::Drums));

        // Errored tracks are left alone by transport commands.
        player.toggle_play_pause();
        player.toggle_play_pause();
        assert!(!backend.is_playing(StemKey::Drums));
        assert!(backend.is_playing(StemKey::Bass));
    }

    #[test]
    fn test_end_of_stream_stops_and_restarts_from_zero() {
        let (mut player, backend) = loaded_player();
        backend.push_event(StemKey::Vocals, HandleEvent::MetadataLoaded { duration: 10.0 });
        player.pump_events();
        player.toggle_play_pause();
        for key in StemKey::ALL {
            backend.push_event(key, HandleEvent::Ended);
        }
        let state = player.pump_events();
        assert!(!state.is_playing);
        assert!(approx(state.current_time, 10.0));

        let state = player.toggle_play_pause();
        assert!(state.is_playing);
        assert!(approx(state.current_time, 0.0));
        assert!(approx(backend.position(StemKey::Other), 0.0));
    }

    #[test]
    fn test_commands_without_stems_are_noops() {
        let mut player = StemPlayer::new(FakeBackend::new(), 100);
        assert_eq!(player.toggle_play_pause(), PlaybackState::new());
        assert_eq!(player.seek(10.0), PlaybackState::new());
        assert!(!player.all_enabled());
    }
}
