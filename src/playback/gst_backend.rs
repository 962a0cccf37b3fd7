use gst::prelude::*;
use gstreamer as gst;

use crate::error::{PlayerError, PlayerResult};
use crate::playback::handle::{HandleEvent, PlaybackBackend, TrackHandle};
use crate::types::stem::StemKey;

// Drops the verbatim `\\?\` prefix canonicalize adds on Windows
#[cfg(windows)]
fn strip_verbatim_prefix(path: std::path::PathBuf) -> std::path::PathBuf {
    match path.to_str().and_then(|p| p.strip_prefix(r"\\?\")) {
        Some(stripped) => std::path::PathBuf::from(stripped),
        None => path,
    }
}

#[cfg(not(windows))]
fn strip_verbatim_prefix(path: std::path::PathBuf) -> std::path::PathBuf {
    path
}

/// Accepts either a URI or a local path; paths must exist.
pub fn source_to_uri(source: &str) -> PlayerResult<String> {
    let source = source.trim();
    if source.is_empty() {
        return Err(PlayerError::InvalidSource(source.to_string()));
    }
    if source.contains("://") {
        return Ok(source.to_string());
    }
    let invalid = |_| PlayerError::InvalidSource(source.to_string());
    let abs_path = strip_verbatim_prefix(std::fs::canonicalize(source).map_err(invalid)?);
    // Percent-encodes reserved characters such as '%' and '#'
    let uri = gst::glib::filename_to_uri(&abs_path, None).map_err(|_| PlayerError::InvalidSource(source.to_string()))?;
    Ok(uri.to_string())
}

/// Backend creating one `playbin` pipeline per stem.
pub struct GstBackend;

impl GstBackend {
    pub fn new() -> PlayerResult<Self> {
        gst::init()?; // Safe to call multiple times
        Ok(GstBackend)
    }
}

impl PlaybackBackend for GstBackend {
    type Handle = GstTrackHandle;

    fn open(&mut self, key: StemKey, source: &str) -> PlayerResult<GstTrackHandle> {
        let uri = source_to_uri(source)?;
        let playbin = gst::ElementFactory::make("playbin")
            .name(format!("stem-{}", key.id()))
            .property("uri", uri.as_str())
            .build()?;
        let bus = playbin.bus().ok_or(PlayerError::NoBus(key))?;

        // Preroll so that duration becomes queryable before the first play.
        if let Err(err) = playbin.set_state(gst::State::Paused) {
            let _ = playbin.set_state(gst::State::Null);
            return Err(err.into());
        }
        log::debug!("Opened {} stem from {}", key, uri);

        Ok(GstTrackHandle {
            key,
            playbin,
            bus,
            playing: false,
            duration_reported: false,
            pending_seek: None,
            released: false,
        })
    }
}

pub struct GstTrackHandle {
    key: StemKey,
    playbin: gst::Element,
    bus: gst::Bus,
    playing: bool,
    duration_reported: bool,
    /// Seek requested before the pipeline prerolled
    pending_seek: Option<f64>,
    released: bool,
}

impl GstTrackHandle {
    fn ensure_live(&self) -> PlayerResult<()> {
        if self.released {
            Err(PlayerError::Released(self.key))
        } else {
            Ok(())
        }
    }

    fn report_duration(&mut self, events: &mut Vec<HandleEvent>) {
        if self.duration_reported {
            return;
        }
        if let Some(duration) = self.playbin.query_duration::<gst::ClockTime>() {
            self.duration_reported = true;
            events.push(HandleEvent::MetadataLoaded {
                duration: duration.seconds_f64(),
            });
        }
    }

    fn seek_now(&self, time: f64) -> PlayerResult<()> {
        self.playbin.seek_simple(
            gst::SeekFlags::FLUSH | gst::SeekFlags::ACCURATE,
            gst::ClockTime::from_seconds_f64(time.max(0.0)),
        )?;
        Ok(())
    }
}

impl TrackHandle for GstTrackHandle {
    fn play(&mut self) -> PlayerResult<()> {
        self.ensure_live()?;
        self.playbin.set_state(gst::State::Playing)?;
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) -> PlayerResult<()> {
        self.ensure_live()?;
        self.playbin.set_state(gst::State::Paused)?;
        self.playing = false;
        Ok(())
    }

    fn seek(&mut self, time: f64) -> PlayerResult<()> {
        self.ensure_live()?;
        if self.seek_now(time).is_err() {
            // Not prerolled yet, retried on ASYNC_DONE
            log::debug!("Deferring seek of {} stem to {:.2}s", self.key, time);
            self.pending_seek = Some(time);
        } else {
            self.pending_seek = None;
        }
        Ok(())
    }

    fn set_volume(&mut self, gain: f64) -> PlayerResult<()> {
        self.ensure_live()?;
        self.playbin.set_property("volume", gain.clamp(0.0, 1.0));
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<HandleEvent> {
        let mut events = Vec::new();
        if self.released {
            return events;
        }

        while let Some(msg) = self.bus.pop() {
            use gst::MessageView;
            match msg.view() {
                MessageView::Error(err) => {
                    events.push(HandleEvent::Failed {
                        message: err.error().to_string(),
                    });
                }
                MessageView::Eos(..) => events.push(HandleEvent::Ended),
                MessageView::AsyncDone(..) => {
                    if let Some(time) = self.pending_seek.take() {
                        if let Err(err) = self.seek_now(time) {
                            log::warn!("Seek of {} stem failed: {}", self.key, err);
                        }
                    }
                    self.report_duration(&mut events);
                }
                MessageView::DurationChanged(..) => self.report_duration(&mut events),
                _ => (),
            }
        }

        if self.playing {
            if let Some(position) = self.playbin.query_position::<gst::ClockTime>() {
                events.push(HandleEvent::TimeUpdate {
                    position: position.seconds_f64(),
                });
            }
        }
        events
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = self.playbin.set_state(gst::State::Null) {
            log::warn!("Failed to stop {} stem: {}", self.key, err);
        }
        self.playing = false;
        self.pending_seek = None;
        self.released = true;
        log::debug!("Released {} stem", self.key);
    }
}

impl Drop for GstTrackHandle {
    fn drop(&mut self) {
        self.release();
    }
}
