use std::path::{Path, PathBuf};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, TryRecvError};
use eframe::egui;

use crate::error::ImportResult;
use crate::ops::stem_import::import_stem_folder;
use crate::playback::handle::PlaybackBackend;
use crate::playback::player::StemPlayer;
use crate::types::catalog::{Catalog, CatalogSelection};
use crate::types::settings::Settings;
use crate::types::stem::StemSource;
use crate::ui::catalog_browser::{CatalogEvent, catalog_browser};
use crate::ui::player_panel::{PlayerPanel, apply_panel_events};

pub struct AppState<B: PlaybackBackend> {
    pub settings: Settings,
    pub catalog: Catalog,
    pub selection: CatalogSelection,
    pub player: StemPlayer<B>,
    /// User-facing message for failed imports and unreadable catalogs
    pub notice: Option<String>,
    /// Folder import running on the import thread
    pending_import: Option<Receiver<ImportResult<StemSource>>>,
}

impl<B: PlaybackBackend> AppState<B> {
    pub fn new(settings: Settings, backend: B) -> Self {
        let player = StemPlayer::new(backend, settings.default_volume);
        Self {
            settings,
            catalog: Catalog::new(),
            selection: CatalogSelection::default(),
            player,
            notice: None,
            pending_import: None,
        }
    }

    pub fn open_catalog(&mut self, path: &Path) {
        match Catalog::load_from_file(path) {
            Ok(catalog) => {
                log::info!(
                    "Loaded catalog {} ({} songs)",
                    path.display(),
                    catalog.song_count()
                );
                self.catalog = catalog;
                self.selection.reset();
                self.player.unload();
                self.notice = None;
            }
            Err(err) => {
                log::warn!("{}", err);
                self.notice = Some(err.to_string());
            }
        }
    }

    /// Starts importing `dir` off the UI thread; `poll_import` picks up the result.
    pub fn import_folder(&mut self, dir: &Path) {
        self.start_import_with(dir, import_stem_folder);
    }

    pub fn is_importing(&self) -> bool {
        self.pending_import.is_some()
    }

    fn start_import_with(
        &mut self,
        dir: &Path,
        import: impl FnOnce(&Path) -> ImportResult<StemSource> + Send + 'static,
    ) {
        let (tx, rx) = channel::bounded(1);
        let dir = dir.to_path_buf();
        let spawned = std::thread::Builder::new()
            .name("stem-import".to_string())
            .spawn(move || {
                let _ = tx.send(import(&dir));
            });
        match spawned {
            // A newer import replaces any still running; its result is dropped
            Ok(_) => self.pending_import = Some(rx),
            Err(err) => {
                log::error!("Failed to spawn import thread: {}", err);
                self.notice = Some(format!("Could not start import: {}", err));
            }
        }
    }

    /// Applies a finished import, if any. Returns true once a result was handled.
    pub fn poll_import(&mut self) -> bool {
        let Some(rx) = &self.pending_import else {
            return false;
        };
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Disconnected) => {
                self.pending_import = None;
                log::error!("Import thread exited without a result");
                self.notice = Some("Stem folder import was interrupted".to_string());
                return true;
            }
        };
        self.pending_import = None;
        self.finish_import(result);
        true
    }

    fn finish_import(&mut self, result: ImportResult<StemSource>) {
        match result {
            Ok(source) => {
                self.selection.reset();
                self.player.load(source);
                self.notice = None;
            }
            Err(err) => {
                log::warn!("Stem folder import failed: {}", err);
                self.notice = Some(err.to_string());
            }
        }
    }

    pub fn handle_catalog_event(&mut self, event: CatalogEvent) {
        match event {
            CatalogEvent::ArtistSelected(id) => self.selection.select_artist(&id),
            CatalogEvent::AlbumSelected(id) => self.selection.select_album(&id),
            CatalogEvent::SongSelected(id) => {
                self.selection.select_song(&id);
                match self.selection.selected_song(&self.catalog) {
                    Some(song) => {
                        let source = song.stem_source();
                        self.player.load(source);
                    }
                    None => log::warn!("Song {} not found in catalog", id),
                }
            }
            CatalogEvent::Back => {
                let had_song = self.selection.song.is_some();
                self.selection.back();
                if had_song {
                    self.player.unload();
                }
            }
            CatalogEvent::OpenCatalog(path) => self.open_catalog(&path),
            CatalogEvent::ImportFolder(dir) => self.import_folder(&dir),
        }
    }
}

pub struct StemitupApp<B: PlaybackBackend> {
    pub state: AppState<B>,
}

impl<B: PlaybackBackend> StemitupApp<B> {
    pub fn new(state: AppState<B>) -> Self {
        Self { state }
    }

    /// Apply command line paths after construction.
    pub fn with_startup_paths(mut self, catalog: Option<PathBuf>, stems: Option<PathBuf>) -> Self {
        if let Some(path) = catalog.or_else(|| self.state.settings.catalog_path.clone()) {
            self.state.open_catalog(&path);
        }
        if let Some(dir) = stems {
            self.state.import_folder(&dir);
        }
        self
    }
}

impl<B: PlaybackBackend> eframe::App for StemitupApp<B> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.state.poll_import();
        self.state.player.pump_events();
        if self.state.player.is_loaded() || self.state.is_importing() {
            // Keep polling handles for metadata and position updates
            ctx.request_repaint_after(Duration::from_millis(self.state.settings.poll_interval_ms));
        }

        // Left: catalog browser
        egui::SidePanel::left("catalog_panel")
            .resizable(true)
            .min_width(220.0)
            .show(ctx, |ui| {
                let events = catalog_browser(ui, &self.state.catalog, &self.state.selection);
                for event in events {
                    self.state.handle_catalog_event(event);
                }
            });

        // Bottom: notices
        let mut dismiss = false;
        if let Some(notice) = &self.state.notice {
            egui::TopBottomPanel::bottom("notice_panel").show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.colored_label(egui::Color32::from_rgb(230, 120, 90), notice.as_str());
                    if ui.button("✖").clicked() {
                        dismiss = true;
                    }
                });
            });
        }
        if dismiss {
            self.state.notice = None;
        }

        // Center: player
        egui::CentralPanel::default().show(ctx, |ui| {
            if self.state.player.is_loaded() {
                let events = PlayerPanel::new(&self.state.player).show(ui);
                apply_panel_events(&mut self.state.player, events);
            } else {
                ui.centered_and_justified(|ui| {
                    if self.state.is_importing() {
                        ui.spinner();
                    } else {
                        ui.label("Pick a song from the catalog or import a stem folder");
                    }
                });
            }
        });
    }
}
