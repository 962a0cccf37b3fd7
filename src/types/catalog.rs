use crate::error::{CatalogError, CatalogResult};
use crate::types::stem::{StemSet, StemSource};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Official stem sets grouped by artist and album.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub artists: Vec<Artist>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    pub albums: Vec<Album>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub name: String,
    pub songs: Vec<Song>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub name: String,
    pub stems: StemSet,
}

impl Song {
    pub fn stem_source(&self) -> StemSource {
        StemSource::new(self.stems.clone(), Some(self.name.clone()))
    }
}

impl Catalog {
    pub fn new() -> Self {
        Catalog {
            artists: Vec::new(),
        }
    }

    /// Load a catalog from a JSON file at the given path.
    pub fn load_from_file(path: &Path) -> CatalogResult<Catalog> {
        let io_err = |source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut file = File::open(path).map_err(io_err)?;
        let mut json = String::new();
        file.read_to_string(&mut json).map_err(io_err)?;
        let catalog = serde_json::from_str(&json).map_err(|source| CatalogError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(catalog)
    }

    pub fn find_artist(&self, artist_id: &str) -> Option<&Artist> {
        self.artists.iter().find(|a| a.id == artist_id)
    }

    pub fn find_album(&self, artist_id: &str, album_id: &str) -> Option<&Album> {
        self.find_artist(artist_id)?
            .albums
            .iter()
            .find(|a| a.id == album_id)
    }

    pub fn find_song(&self, artist_id: &str, album_id: &str, song_id: &str) -> Option<&Song> {
        self.find_album(artist_id, album_id)?
            .songs
            .iter()
            .find(|s| s.id == song_id)
    }

    pub fn song_count(&self) -> usize {
        self.artists
            .iter()
            .flat_map(|artist| &artist.albums)
            .map(|album| album.songs.len())
            .sum()
    }
}

/// Drill-down position in the catalog browser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogSelection {
    pub artist: Option<String>,
    pub album: Option<String>,
    pub song: Option<String>,
}

impl CatalogSelection {
    pub fn select_artist(&mut self, id: &str) {
        self.artist = Some(id.to_string());
        self.album = None;
        self.song = None;
    }

    pub fn select_album(&mut self, id: &str) {
        self.album = Some(id.to_string());
        self.song = None;
    }

    pub fn select_song(&mut self, id: &str) {
        self.song = Some(id.to_string());
    }

    /// Step one level up.
    pub fn back(&mut self) {
        if self.song.take().is_some() {
            return;
        }
        if self.album.take().is_some() {
            return;
        }
        self.artist = None;
    }

    pub fn reset(&mut self) {
        *self = CatalogSelection::default();
    }

    pub fn selected_song<'a>(&self, catalog: &'a Catalog) -> Option<&'a Song> {
        catalog.find_song(
            self.artist.as_deref()?,
            self.album.as_deref()?,
            self.song.as_deref()?,
        )
    }
}
