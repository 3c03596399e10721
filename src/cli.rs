use clap::Parser;
use std::path::PathBuf;

use crate::audio::spectrum::Transform;
use crate::render::Style;

#[derive(Parser, Debug)]
#[command(name = "spectrovid", about = "Render an audio file's spectrogram as an animated video")]
pub struct Cli {
    /// Input audio file (WAV, MP3, M4A). Prompts interactively when omitted.
    pub input: Option<PathBuf>,

    /// Output video file
    #[arg(short, long, default_value = "visualization.mp4")]
    pub output: PathBuf,

    /// Visual style
    #[arg(short, long, value_enum)]
    pub style: Option<Style>,

    /// Time-frequency transform (defaults to stft for heatmap, mel for waveform)
    #[arg(long, value_enum)]
    pub transform: Option<Transform>,

    /// Frames per second; also sets the spectrogram hop length
    #[arg(long)]
    pub fps: Option<u32>,

    /// Video width in pixels (even)
    #[arg(long)]
    pub width: Option<u32>,

    /// Video height in pixels (even)
    #[arg(long)]
    pub height: Option<u32>,

    /// H.264 CRF quality (0-51, lower = better). Ignored when --bitrate is set.
    #[arg(long)]
    pub crf: Option<u32>,

    /// Video bitrate (e.g. 2400k, 5M). When set, uses -b:v instead of -crf.
    #[arg(short, long)]
    pub bitrate: Option<String>,

    /// FFmpeg video codec
    #[arg(long)]
    pub codec: Option<String>,

    /// FFmpeg pixel format
    #[arg(long)]
    pub pix_fmt: Option<String>,

    /// Mux the source audio into the video
    #[arg(long, conflicts_with = "silent")]
    pub with_audio: bool,

    /// Produce a video without an audio track
    #[arg(long)]
    pub silent: bool,

    /// Hide the heatmap colorbar
    #[arg(long)]
    pub no_colorbar: bool,

    /// Do not draw a progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Config file (default: ./spectrovid.toml or ~/.config/spectrovid/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// `Some(true)`/`Some(false)` when audio muxing was chosen explicitly.
    pub fn mux_choice(&self) -> Option<bool> {
        if self.with_audio {
            Some(true)
        } else if self.silent {
            Some(false)
        } else {
            None
        }
    }
}
