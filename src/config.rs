use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::audio::resample::DEFAULT_SAMPLE_RATE;
use crate::render::waveform::GlowTier;
use crate::render::{RenderConfig, Style};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub waveform: WaveformConfig,
    #[serde(default)]
    pub heatmap: HeatmapConfig,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub style: Option<Style>,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_dpi")]
    pub dpi: f32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_crf")]
    pub crf: u32,
    #[serde(default = "default_codec")]
    pub codec: String,
    #[serde(default = "default_pix_fmt")]
    pub pix_fmt: String,
    /// Overrides the style's default rate control when set.
    #[serde(default)]
    pub bitrate: Option<String>,
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_n_fft")]
    pub n_fft: usize,
    #[serde(default = "default_n_mels")]
    pub n_mels: usize,
    #[serde(default = "default_top_db")]
    pub top_db: f32,
}

#[derive(Debug, Deserialize)]
pub struct WaveformConfig {
    #[serde(default = "default_colors")]
    pub colors: Vec<String>,
    #[serde(default = "default_glow")]
    pub glow: Vec<GlowTier>,
}

#[derive(Debug, Deserialize)]
pub struct HeatmapConfig {
    #[serde(default = "default_colorbar")]
    pub colorbar: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            style: None,
            width: default_width(),
            height: default_height(),
            dpi: default_dpi(),
            fps: default_fps(),
            crf: default_crf(),
            codec: default_codec(),
            pix_fmt: default_pix_fmt(),
            bitrate: None,
            ffmpeg: default_ffmpeg(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            n_fft: default_n_fft(),
            n_mels: default_n_mels(),
            top_db: default_top_db(),
        }
    }
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            colors: default_colors(),
            glow: default_glow(),
        }
    }
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            colorbar: default_colorbar(),
        }
    }
}

fn default_width() -> u32 { RenderConfig::default().width }
fn default_height() -> u32 { RenderConfig::default().height }
fn default_dpi() -> f32 { RenderConfig::default().dpi }
fn default_fps() -> u32 { 30 }
fn default_crf() -> u32 { 18 }
fn default_codec() -> String { "libx264".into() }
fn default_pix_fmt() -> String { "yuv420p".into() }
fn default_ffmpeg() -> String { "ffmpeg".into() }
fn default_sample_rate() -> u32 { DEFAULT_SAMPLE_RATE }
fn default_n_fft() -> usize { 2048 }
fn default_n_mels() -> usize { 128 }
fn default_top_db() -> f32 { 80.0 }
fn default_colors() -> Vec<String> {
    vec!["#FF00FF".into(), "#00FFFF".into(), "#FF1493".into()]
}
fn default_glow() -> Vec<GlowTier> { RenderConfig::default().glow_tiers }
fn default_colorbar() -> bool { true }

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Invalid config file: {}", path.display()))
}

/// Explicit path, else `./spectrovid.toml`, else the per-user config file.
pub fn find_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("spectrovid.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("spectrovid").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("spectrovid").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.output.width, 1200);
        assert_eq!(cfg.output.height, 800);
        assert_eq!(cfg.output.fps, 30);
        assert_eq!(cfg.output.style, None);
        assert_eq!(cfg.analysis.n_mels, 128);
        assert_eq!(cfg.analysis.sample_rate, 22050);
        assert_eq!(cfg.waveform.colors.len(), 3);
        assert_eq!(cfg.waveform.glow.len(), 3);
        assert!(cfg.heatmap.colorbar);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg: Config = toml::from_str(
            r##"
            [output]
            style = "waveform"
            fps = 24
            bitrate = "8M"

            [analysis]
            sample_rate = 44100

            [waveform]
            colors = ["#FFFFFF"]
            glow = [{ width = 2.0, alpha = 0.5 }]

            [heatmap]
            colorbar = false
            "##,
        )
        .unwrap();
        assert_eq!(cfg.output.style, Some(Style::Waveform));
        assert_eq!(cfg.output.fps, 24);
        assert_eq!(cfg.output.width, 1200);
        assert_eq!(cfg.output.bitrate.as_deref(), Some("8M"));
        assert_eq!(cfg.output.codec, "libx264");
        assert_eq!(cfg.analysis.n_fft, 2048);
        assert_eq!(cfg.analysis.sample_rate, 44100);
        assert_eq!(cfg.waveform.colors, vec!["#FFFFFF".to_string()]);
        assert_eq!(cfg.waveform.glow, vec![GlowTier { width: 2.0, alpha: 0.5 }]);
        assert!(!cfg.heatmap.colorbar);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[output]\nwidth = \"wide\"\n").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn explicit_path_wins() {
        let p = Path::new("/tmp/custom.toml");
        assert_eq!(find_config_path(Some(p)), Some(p.to_path_buf()));
    }
}
