use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use gstreamer as gst;
use gstreamer_pbutils as gst_pbutils;

use crate::error::{ImportError, ImportResult};
use crate::playback::gst_backend::source_to_uri;
use crate::types::stem::{StemKey, StemSet, StemSource};

/// Upper bound for discovering a single stem file
const DISCOVER_TIMEOUT_SECS: u64 = 2;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "flac", "m4a", "aac", "opus"];

fn is_audio_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Which stem a file holds, judged from its file stem: `vocals.wav`,
/// `song_vocals.flac`, `song-vocals.mp3` and `song vocals.ogg` all match.
pub fn stem_key_for_file(path: &Path) -> Option<StemKey> {
    let name = path.file_stem()?.to_str()?.to_lowercase();
    StemKey::ALL.into_iter().find(|key| {
        let id = key.id();
        name == id
            || ['_', '-', ' ', '.']
                .iter()
                .any(|sep| name.ends_with(&format!("{}{}", sep, id)))
    })
}

/// Locates one audio file per stem inside `dir`.
///
/// # Arguments
/// * `dir` - Folder holding the separated stems.
///
/// Files are visited in name order and the first match per stem wins.
pub fn find_stem_files(dir: &Path) -> ImportResult<BTreeMap<StemKey, PathBuf>> {
    let io_err = |source| ImportError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && is_audio_extension(&path) {
            paths.push(path);
        }
    }
    paths.sort();

    let mut found = BTreeMap::new();
    for path in paths {
        if let Some(key) = stem_key_for_file(&path) {
            found.entry(key).or_insert(path);
        }
    }
    Ok(found)
}

/// Checks that `path` decodes to at least one audio stream and returns its
/// duration in seconds when known.
pub fn discover_audio(path: &Path) -> ImportResult<Option<f64>> {
    let discover_err = |reason: String| ImportError::Discover {
        path: path.to_path_buf(),
        reason,
    };
    gst::init().map_err(|e| discover_err(e.to_string()))?;
    let uri = source_to_uri(&path.to_string_lossy()).map_err(|e| discover_err(e.to_string()))?;
    let timeout = gst::ClockTime::from_seconds(DISCOVER_TIMEOUT_SECS);
    let discoverer = gst_pbutils::Discoverer::new(timeout)
        .map_err(|e| discover_err(e.to_string()))?;
    let info = discoverer
        .discover_uri(&uri)
        .map_err(|e| discover_err(e.to_string()))?;
    if info.audio_streams().is_empty() {
        return Err(ImportError::NotAudio {
            path: path.to_path_buf(),
        });
    }
    Ok(info.duration().map(|d| d.seconds_f64()))
}

/// Builds a stem source from a folder, validating every stem with `check`.
pub fn import_stem_folder_with(
    dir: &Path,
    check: impl Fn(&Path) -> ImportResult<Option<f64>>,
) -> ImportResult<StemSource> {
    let mut found = find_stem_files(dir)?;
    let mut take = |key: StemKey| -> ImportResult<String> {
        let path = found.remove(&key).ok_or(ImportError::MissingStem(key))?;
        if let Some(duration) = check(&path)? {
            log::debug!("{} stem {} lasts {:.2}s", key, path.display(), duration);
        }
        Ok(path.to_string_lossy().to_string())
    };
    let stems = StemSet {
        vocals: take(StemKey::Vocals)?,
        bass: take(StemKey::Bass)?,
        drums: take(StemKey::Drums)?,
        other: take(StemKey::Other)?,
    };
    let song_name = dir
        .file_name()
        .map(|name| name.to_string_lossy().to_string());
    log::info!("Imported stem folder {}", dir.display());
    Ok(StemSource::new(stems, song_name))
}

/// Builds a stem source from a folder, checking each file with GStreamer.
pub fn import_stem_folder(dir: &Path) -> ImportResult<StemSource> {
    import_stem_folder_with(dir, discover_audio)
}
