pub mod ffmpeg;
pub mod mux;
