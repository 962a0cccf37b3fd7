pub mod app;
pub mod catalog_browser;
pub mod player_panel;
