use std::path::PathBuf;

use thiserror::Error;

use crate::audio::decode::DecodeError;
use crate::encode::ffmpeg::FfmpegError;

/// Every way a render run can fail, one variant per failure class.
#[derive(Debug, Error)]
pub enum VisualizerError {
    #[error("file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("unsupported file type: {} (expected one of .wav, .mp3, .m4a)", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("could not decode audio")]
    Decode(#[from] DecodeError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("video encoding failed")]
    Encode(#[source] FfmpegError),

    #[error("adding audio to video failed")]
    Mux(#[source] FfmpegError),
}

impl VisualizerError {
    /// True for errors the interactive prompt recovers from by asking again.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::InputNotFound(_) | Self::UnsupportedFormat(_))
    }
}

/// Renders an error with its full `source()` chain on one line.
pub fn describe(err: &(dyn std::error::Error + 'static)) -> String {
    let mut msg = err.to_string();
    let mut cur = err.source();
    while let Some(src) = cur {
        msg.push_str(": ");
        msg.push_str(&src.to_string());
        cur = src.source();
    }
    msg
}
