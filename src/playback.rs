pub mod gst_backend;
pub mod handle;
pub mod player;

#[cfg(test)]
pub mod testing;
