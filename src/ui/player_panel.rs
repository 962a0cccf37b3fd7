use eframe::egui;

use crate::ops::time_format::format_time;
use crate::playback::handle::PlaybackBackend;
use crate::playback::player::StemPlayer;
use crate::types::stem::StemKey;
use crate::types::track::{MAX_VOLUME, TrackStatus};

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerPanelEvent {
    TogglePlayPause,
    /// Seek bar moved, in seconds
    Seek(f64),
    ToggleStem(StemKey),
    ToggleAll,
    VolumeChanged(StemKey, u8),
}

/// Transport, stem toggles and volume sliders for one loaded stem set.
pub struct PlayerPanel<'a, B: PlaybackBackend> {
    player: &'a StemPlayer<B>,
}

impl<'a, B: PlaybackBackend> PlayerPanel<'a, B> {
    pub fn new(player: &'a StemPlayer<B>) -> Self {
        Self { player }
    }

    pub fn show(self, ui: &mut egui::Ui) -> Vec<PlayerPanelEvent> {
        let mut events = Vec::new();
        let state = self.player.state();

        if let Some(name) = self.player.song_name() {
            ui.heading(name);
            ui.add_space(8.0);
        }

        // Main controls
        ui.horizontal(|ui| {
            let label = if state.is_playing { "⏸" } else { "▶" };
            if ui
                .add_sized([48.0, 48.0], egui::Button::new(label))
                .clicked()
            {
                events.push(PlayerPanelEvent::TogglePlayPause);
            }

            ui.vertical(|ui| {
                let mut time = state.current_time;
                let slider = egui::Slider::new(&mut time, 0.0..=state.seek_max())
                    .step_by(0.1)
                    .show_value(false);
                if ui.add(slider).changed() {
                    events.push(PlayerPanelEvent::Seek(time));
                }
                ui.horizontal(|ui| {
                    ui.label(format_time(state.current_time));
                    ui.label("/");
                    ui.label(format_time(state.duration));
                });
            });
        });
        ui.add_space(12.0);

        // Stem toggles
        ui.horizontal(|ui| {
            let mut all = self.player.all_enabled();
            if ui.checkbox(&mut all, "All").changed() {
                events.push(PlayerPanelEvent::ToggleAll);
            }
            for track in self.player.tracks() {
                let mut enabled = track.enabled;
                let response = ui.add_enabled(
                    !track.is_errored(),
                    egui::Checkbox::new(&mut enabled, track.key.label()),
                );
                if response.changed() {
                    events.push(PlayerPanelEvent::ToggleStem(track.key));
                }
            }
        });
        ui.add_space(12.0);

        // Volume sliders
        egui::Grid::new("stem_volumes")
            .num_columns(3)
            .spacing([12.0, 8.0])
            .show(ui, |ui| {
                for track in self.player.tracks() {
                    ui.label(format!("🔊 {}", track.key.label()))
                        .on_hover_text(track.source_url.as_str());
                    let mut volume = track.volume;
                    let slider = egui::Slider::new(&mut volume, 0..=MAX_VOLUME).show_value(false);
                    if ui.add(slider).changed() {
                        events.push(PlayerPanelEvent::VolumeChanged(track.key, volume));
                    }
                    match &track.status {
                        TrackStatus::Errored(message) => {
                            ui.label(egui::RichText::new("unavailable").color(egui::Color32::RED))
                                .on_hover_text(message.as_str());
                        }
                        TrackStatus::Loading => {
                            ui.label(
                                egui::RichText::new(format!("{}% …", track.volume))
                                    .color(egui::Color32::GRAY),
                            );
                        }
                        TrackStatus::Ready => {
                            ui.label(format!("{}%", track.volume));
                        }
                    }
                    ui.end_row();
                }
            });

        events
    }
}

/// Apply the panel's events to the player in order.
pub fn apply_panel_events<B: PlaybackBackend>(
    player: &mut StemPlayer<B>,
    events: Vec<PlayerPanelEvent>,
) {
    for event in events {
        match event {
            PlayerPanelEvent::TogglePlayPause => {
                player.toggle_play_pause();
            }
            PlayerPanelEvent::Seek(time) => {
                player.seek(time);
            }
            PlayerPanelEvent::ToggleStem(key) => {
                player.toggle_track(key);
            }
            PlayerPanelEvent::ToggleAll => {
                player.toggle_all();
            }
            PlayerPanelEvent::VolumeChanged(key, volume) => {
                player.set_volume(key, volume);
            }
        }
    }
}
