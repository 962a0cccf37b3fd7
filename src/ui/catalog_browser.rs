use eframe::egui;
use std::path::PathBuf;

use crate::types::catalog::{Catalog, CatalogSelection};

#[derive(Debug, Clone, PartialEq)]
pub enum CatalogEvent {
    ArtistSelected(String),
    AlbumSelected(String),
    SongSelected(String),
    /// One level up
    Back,
    OpenCatalog(PathBuf),
    ImportFolder(PathBuf),
}

/// Draws the artist → album → song drill-down and the import buttons.
pub fn catalog_browser(
    ui: &mut egui::Ui,
    catalog: &Catalog,
    selection: &CatalogSelection,
) -> Vec<CatalogEvent> {
    let mut events = Vec::new();

    ui.vertical(|ui| {
        ui.heading("Official Stems");
        ui.separator();

        ui.horizontal(|ui| {
            if ui.button("Open Catalog").clicked() {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter("Catalog", &["json"])
                    .pick_file()
                {
                    events.push(CatalogEvent::OpenCatalog(path));
                }
            }
            if ui.button("Import Stem Folder").clicked() {
                if let Some(dir) = rfd::FileDialog::new().pick_folder() {
                    events.push(CatalogEvent::ImportFolder(dir));
                }
            }
        });
        ui.separator();

        if catalog.artists.is_empty() {
            ui.label("No catalog loaded");
            return;
        }

        let artist = selection
            .artist
            .as_deref()
            .and_then(|id| catalog.find_artist(id));
        let album = match (selection.artist.as_deref(), selection.album.as_deref()) {
            (Some(artist_id), Some(album_id)) => catalog.find_album(artist_id, album_id),
            _ => None,
        };

        if artist.is_some() && ui.button("⬅ Back").clicked() {
            events.push(CatalogEvent::Back);
        }

        match (artist, album) {
            (None, _) => {
                ui.label(egui::RichText::new("Select an Artist").strong());
                for artist in &catalog.artists {
                    if ui.button(format!("{}  ›", artist.name)).clicked() {
                        events.push(CatalogEvent::ArtistSelected(artist.id.clone()));
                    }
                }
            }
            (Some(artist), None) => {
                ui.label(egui::RichText::new(format!("{} › Albums", artist.name)).strong());
                for album in &artist.albums {
                    if ui.button(format!("{}  ›", album.name)).clicked() {
                        events.push(CatalogEvent::AlbumSelected(album.id.clone()));
                    }
                }
            }
            (Some(artist), Some(album)) => {
                ui.label(
                    egui::RichText::new(format!("{} › {}", artist.name, album.name)).strong(),
                );
                for song in &album.songs {
                    let selected = selection.song.as_deref() == Some(song.id.as_str());
                    if ui.selectable_label(selected, song.name.as_str()).clicked() && !selected {
                        events.push(CatalogEvent::SongSelected(song.id.clone()));
                    }
                }
            }
        }
    });

    events
}
