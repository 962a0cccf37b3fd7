mod error;
mod ops;
mod playback;
mod types;
mod ui;

use crate::error::PlayerError;
use crate::playback::gst_backend::GstBackend;
use crate::types::settings::{LaunchOptions, Settings};
use crate::ui::app::{AppState, StemitupApp};

fn load_settings(options: &LaunchOptions) -> Settings {
    let Some(path) = options.settings_path.clone().or_else(Settings::default_path) else {
        return Settings::default();
    };
    match Settings::load_or_default(&path) {
        Ok(settings) => settings,
        Err(err) => {
            // Logger is not up yet
            eprintln!("{}; using default settings", err);
            Settings::default()
        }
    }
}

/// Turns a backend failure into an eframe startup error so `main` exits non-zero.
fn startup_error(err: PlayerError) -> eframe::Error {
    log::error!("Failed to initialize playback: {}", err);
    eframe::Error::AppCreation(Box::new(err))
}

fn main() -> eframe::Result<()> {
    let options = LaunchOptions::from_args(std::env::args().skip(1));
    let settings = load_settings(&options);

    // RUST_LOG overrides the configured filter
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(settings.log_filter.as_str()),
    )
    .format_timestamp_millis()
    .init();
    log::info!("stemitup starting up");

    let backend = GstBackend::new().map_err(startup_error)?;

    let app = StemitupApp::new(AppState::new(settings, backend))
        .with_startup_paths(options.catalog_path, options.stems_dir);

    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "Stemitup",
        native_options,
        Box::new(|_cc| Ok(Box::new(app))),
    )?;
    Ok(())
}
