pub mod catalog;
pub mod playback_state;
pub mod settings;
pub mod stem;
pub mod track;
