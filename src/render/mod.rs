pub mod canvas;
pub mod heatmap;
pub mod palette;
pub mod waveform;

use serde::Deserialize;

use crate::audio::spectrum::Transform;
use crate::error::VisualizerError;
use canvas::Canvas;
use palette::Rgb;
use waveform::GlowTier;

/// Visual style of the rendered video.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    /// Scrolling spectrogram heatmap
    Heatmap,
    /// Glowing waves driven by mel energy
    Waveform,
}

impl Style {
    pub fn default_transform(self) -> Transform {
        match self {
            Style::Heatmap => Transform::Stft,
            Style::Waveform => Transform::Mel,
        }
    }

    pub fn muxes_audio_by_default(self) -> bool {
        matches!(self, Style::Waveform)
    }

    pub fn default_bitrate(self) -> Option<&'static str> {
        match self {
            Style::Heatmap => None,
            Style::Waveform => Some("5000k"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The canvas holds a freshly drawn frame.
    Drawn,
    /// The canvas was left as it was; the previous frame is repeated.
    Frozen,
}

/// Anything that can paint animation tick `tick` onto a canvas.
pub trait FrameSource {
    fn render(&mut self, tick: usize, canvas: &mut Canvas) -> FrameOutcome;
}

#[derive(Clone, Debug)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// Pixels per inch, used to convert line widths given in points.
    pub dpi: f32,
    pub fps: u32,
    pub wave_colors: Vec<Rgb>,
    pub glow_tiers: Vec<GlowTier>,
    pub x_limits: (f32, f32),
    pub y_limits: (f32, f32),
    pub colorbar: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 800,
            dpi: 100.0,
            fps: 30,
            wave_colors: vec![[0xFF, 0x00, 0xFF], [0x00, 0xFF, 0xFF], [0xFF, 0x14, 0x93]],
            glow_tiers: vec![
                GlowTier { width: 4.0, alpha: 1.0 },
                GlowTier { width: 6.0, alpha: 0.6 },
                GlowTier { width: 8.0, alpha: 0.3 },
            ],
            x_limits: (0.0, waveform::X_SPAN),
            y_limits: (-2.0, 2.0),
            colorbar: true,
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> Result<(), VisualizerError> {
        let invalid = |msg: String| Err(VisualizerError::InvalidConfig(msg));
        if self.width == 0 || self.height == 0 {
            return invalid(format!("frame size {}x{} is empty", self.width, self.height));
        }
        if self.width % 2 != 0 || self.height % 2 != 0 {
            return invalid(format!(
                "frame size {}x{} must be even for yuv420p",
                self.width, self.height
            ));
        }
        if self.fps == 0 {
            return invalid("fps must be positive".into());
        }
        if self.dpi.is_nan() || self.dpi <= 0.0 {
            return invalid(format!("dpi must be positive, got {}", self.dpi));
        }
        if self.wave_colors.is_empty() || self.glow_tiers.is_empty() {
            return invalid("at least one wave color and one glow tier are required".into());
        }
        if self.x_limits.0 >= self.x_limits.1 || self.y_limits.0 >= self.y_limits.1 {
            return invalid("axis limits must be increasing".into());
        }
        Ok(())
    }
}
