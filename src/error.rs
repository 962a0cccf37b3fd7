//! Error types for playback, catalog/settings files and stem folder import

use std::path::PathBuf;

use gstreamer as gst;
use thiserror::Error;

use crate::types::stem::StemKey;

/// Errors raised by a playback backend or one of its track handles
#[derive(Error, Debug)]
pub enum PlayerError {
    /// The source could not be turned into a URI
    #[error("Invalid stem source '{0}'")]
    InvalidSource(String),

    /// GStreamer could not be initialised
    #[error("Failed to initialise GStreamer: {0}")]
    Init(#[from] gst::glib::Error),

    /// GStreamer element could not be created or configured
    #[error("GStreamer error: {0}")]
    Gst(#[from] gst::glib::BoolError),

    /// Pipeline has no message bus to report on
    #[error("Pipeline for {0} has no bus")]
    NoBus(StemKey),

    /// Pipeline refused a state change
    #[error("Pipeline state change failed: {0}")]
    StateChange(#[from] gst::StateChangeError),

    /// Handle has already been released
    #[error("Track handle for {0} was released")]
    Released(StemKey),
}

/// Result type for playback operations
pub type PlayerResult<T> = Result<T, PlayerError>;

/// Errors reading or writing the catalog and settings files
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors found while importing a folder of stem files
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Failed to read stem folder {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No {0} stem found in folder")]
    MissingStem(StemKey),

    #[error("{path} is not an audio file")]
    NotAudio { path: PathBuf },

    #[error("Could not inspect {path}: {reason}")]
    Discover { path: PathBuf, reason: String },
}

pub type ImportResult<T> = Result<T, ImportError>;
