use crate::error::{CatalogError, CatalogResult};
use crate::types::track::MAX_VOLUME;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Catalog opened on start-up
    pub catalog_path: Option<PathBuf>,
    /// Volume given to every stem when a stem set loads
    pub default_volume: u8,
    /// How often handle events are pumped while playing
    pub poll_interval_ms: u64,
    /// env_logger filter used when RUST_LOG is unset
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            catalog_path: None,
            default_volume: MAX_VOLUME,
            poll_interval_ms: 50,
            log_filter: "info".to_string(),
        }
    }
}

impl Settings {
    /// `<config_dir>/stemitup/settings.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("stemitup").join(SETTINGS_FILE))
    }

    /// Load settings, falling back to defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> CatalogResult<Settings> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Settings::default());
            }
            Err(source) => {
                return Err(CatalogError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let mut settings: Settings =
            serde_json::from_str(&json).map_err(|source| CatalogError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        settings.default_volume = settings.default_volume.min(MAX_VOLUME);
        settings.poll_interval_ms = settings.poll_interval_ms.max(1);
        Ok(settings)
    }
}

/// Command line overrides: `--settings <file>`, `--catalog <file>`, `--stems <dir>`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaunchOptions {
    pub settings_path: Option<PathBuf>,
    pub catalog_path: Option<PathBuf>,
    pub stems_dir: Option<PathBuf>,
}

impl LaunchOptions {
    pub fn from_args(args: impl IntoIterator<Item = String>) -> Self {
        let mut options = LaunchOptions::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let slot = match arg.as_str() {
                "--settings" => &mut options.settings_path,
                "--catalog" => &mut options.catalog_path,
                "--stems" => &mut options.stems_dir,
                _ => {
                    log::warn!("Ignoring unknown argument '{}'", arg);
                    continue;
                }
            };
            match args.next() {
                Some(value) => *slot = Some(PathBuf::from(value)),
                None => log::warn!("Missing value for {}", arg),
            }
        }
        options
    }
}
