pub mod stem_import;
pub mod time_format;
