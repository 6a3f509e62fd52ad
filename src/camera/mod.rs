pub mod discovery;
pub mod ffmpeg_backend;
pub mod jpeg;
pub mod surface;
pub mod traits;
